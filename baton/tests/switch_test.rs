use std::cell::{Cell, RefCell};
use std::rc::Rc;

use baton::{switch_to_new, Context};

const STACK_SIZE: usize = 64 * 1024;

#[test]
fn switch_into_new_context_and_back() {
    let resumer = switch_to_new(STACK_SIZE, (), |caller: Context<()>| caller).unwrap();
    // The entry function returned our context instead of switching back to
    // it, so nothing resumed us.
    assert!(resumer.is_none());
}

#[test]
fn entry_function_side_effects_are_visible() {
    let counter = Rc::new(Cell::new(0));

    let inner = counter.clone();
    let resumer = switch_to_new(STACK_SIZE, (), move |caller: Context<()>| {
        inner.set(1);
        caller
    })
    .unwrap();

    assert!(resumer.is_none());
    assert_eq!(counter.get(), 1);
}

#[test]
fn attached_data_reaches_the_new_context() {
    let value = Rc::new(Cell::new(0));

    let resumer = switch_to_new(STACK_SIZE, value.clone(), |caller: Context<Rc<Cell<i32>>>| {
        // The handle to our creator carries the value it attached; writes
        // through it are visible on the other side of the switch.
        caller.data().set(1);
        caller
    })
    .unwrap();

    assert!(resumer.is_none());
    assert_eq!(value.get(), 1);
}

#[test]
fn data_is_attached_fresh_on_every_switch() {
    let helper = switch_to_new(STACK_SIZE, 10, |main: Context<i32>| {
        assert_eq!(*main.data(), 10);
        let main = main.switch(20).unwrap().unwrap();
        assert_eq!(*main.data(), 30);
        main
    })
    .unwrap();

    let helper = helper.unwrap();
    assert_eq!(*helper.data(), 20);
    let resumer = helper.switch(30).unwrap();
    assert!(resumer.is_none());
}

#[test]
fn nested_context_switches_resume_innermost_first() {
    let counter = Rc::new(Cell::new(0));

    let outer = counter.clone();
    let resumer = switch_to_new(STACK_SIZE, (), move |caller: Context<()>| {
        assert_eq!(outer.get(), 0);
        outer.set(1);

        let inner = outer.clone();
        let nested = switch_to_new(STACK_SIZE, (), move |caller: Context<()>| {
            assert_eq!(inner.get(), 1);
            inner.set(2);
            caller
        })
        .unwrap();

        assert!(nested.is_none());
        assert_eq!(outer.get(), 2);
        outer.set(3);
        caller
    })
    .unwrap();

    assert!(resumer.is_none());
    assert_eq!(counter.get(), 3);
}

#[test]
fn cooperating_pair_alternates_in_lockstep() {
    let counter = Rc::new(Cell::new(0));

    let steps = counter.clone();
    let helper = switch_to_new(STACK_SIZE, (), move |main: Context<()>| {
        assert_eq!(steps.get(), 0);
        steps.set(1);
        let main = main.switch(()).unwrap().unwrap();
        assert_eq!(steps.get(), 2);
        steps.set(3);
        let main = main.switch(()).unwrap().unwrap();
        assert_eq!(steps.get(), 4);
        steps.set(5);
        main
    })
    .unwrap();

    assert_eq!(counter.get(), 1);
    counter.set(2);
    let helper = helper.unwrap().switch(()).unwrap();

    assert_eq!(counter.get(), 3);
    counter.set(4);
    let helper = helper.unwrap().switch(()).unwrap();

    assert_eq!(counter.get(), 5);
    assert!(helper.is_none());
}

#[test]
fn contexts_can_be_created_back_to_back() {
    let counter = Rc::new(Cell::new(0));

    for round in 0..100 {
        let inner = counter.clone();
        let resumer = switch_to_new(STACK_SIZE, (), move |caller: Context<()>| {
            inner.set(inner.get() + 1);
            caller
        })
        .unwrap();
        assert!(resumer.is_none());
        assert_eq!(counter.get(), round + 1);
    }
}

const RING_SIZE: usize = 5;
const LAPS: usize = 3;
const DRIVER: usize = usize::MAX;

struct Ring {
    counter: Cell<usize>,
    order: RefCell<Vec<usize>>,
    // Handles to suspended members, indexed by the member id the suspension
    // attached; the driver's handle has its own slot.
    parked: RefCell<Vec<Option<Context<usize>>>>,
    driver: RefCell<Option<Context<usize>>>,
}

impl Ring {
    fn deposit(&self, ctx: Context<usize>) {
        match *ctx.data() {
            DRIVER => *self.driver.borrow_mut() = Some(ctx),
            member => self.parked.borrow_mut()[member] = Some(ctx),
        }
    }
}

#[test]
fn ring_of_contexts_runs_in_creation_order_for_multiple_laps() {
    let ring = Rc::new(Ring {
        counter: Cell::new(0),
        order: RefCell::new(Vec::new()),
        parked: RefCell::new((0..RING_SIZE).map(|_| None).collect()),
        driver: RefCell::new(None),
    });

    for member in 0..RING_SIZE {
        let inner = ring.clone();
        let parked = switch_to_new(STACK_SIZE, DRIVER, move |creator: Context<usize>| {
            // Park until the ring is driven; the first wake-up starts lap 1.
            let mut resumer = creator.switch(member).unwrap();
            for lap in 1..=LAPS {
                if let Some(who) = resumer.take() {
                    inner.deposit(who);
                }
                inner.counter.set(inner.counter.get() + 1);
                inner.order.borrow_mut().push(member);

                let next = if lap == LAPS && member == RING_SIZE - 1 {
                    inner.driver.borrow_mut().take().unwrap()
                } else {
                    inner.parked.borrow_mut()[(member + 1) % RING_SIZE]
                        .take()
                        .unwrap()
                };
                if lap == LAPS {
                    // Finishing: hand control (and this stack) onward.
                    return next;
                }
                resumer = next.switch(member).unwrap();
            }
            unreachable!();
        })
        .unwrap()
        .unwrap();
        ring.deposit(parked);
    }

    let first = ring.parked.borrow_mut()[0].take().unwrap();
    let resumer = first.switch(DRIVER).unwrap();
    assert!(resumer.is_none());

    assert_eq!(ring.counter.get(), RING_SIZE * LAPS);
    let expected: Vec<usize> = (0..LAPS).flat_map(|_| 0..RING_SIZE).collect();
    assert_eq!(*ring.order.borrow(), expected);

    // Every handle was consumed on the way out.
    assert!(ring.driver.borrow().is_none());
    assert!(ring.parked.borrow().iter().all(|slot| slot.is_none()));
}

#[test]
fn stack_allocation_failure_is_an_error_without_side_effects() {
    let touched = Rc::new(Cell::new(false));

    let inner = touched.clone();
    let result = switch_to_new(usize::MAX, (), move |caller: Context<()>| {
        inner.set(true);
        caller
    });

    assert!(result.is_err());
    assert!(!touched.get());
}

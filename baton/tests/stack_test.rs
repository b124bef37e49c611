#![cfg(unix)]

use std::io::Error;

use baton::stack::*;

#[test]
fn create_one_mb_stack() -> Result<(), Error> {
    GuardedStack::new(1024 * 1024)?;
    Ok(())
}

#[test]
fn rounds_size_up_to_whole_pages() {
    let stack = GuardedStack::new(1).unwrap();
    assert_eq!(stack.size(), page_size());

    let stack = GuardedStack::new(page_size() + 1).unwrap();
    assert_eq!(stack.size(), 2 * page_size());
}

#[test]
fn usable_area_spans_top_to_bottom() {
    let size = 256 * 1024;
    let stack = GuardedStack::new(size).unwrap();
    assert_eq!(stack.bottom() as usize - stack.top() as usize, stack.size());
    assert!(stack.size() >= size);
}

#[test]
fn create_many_small_stacks() {
    let mut stacks = vec![];
    for _i in 0..10_000 {
        let stack = GuardedStack::new(64 * 1024);
        assert!(stack.is_ok());
        stacks.push(stack);
    }
}

#[test]
fn oversized_request_fails_cleanly() {
    assert!(GuardedStack::new(usize::MAX).is_err());
}

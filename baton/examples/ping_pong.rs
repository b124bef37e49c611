use baton::{switch_to_new, Context};

fn main() {
    // Two contexts handing a counter back and forth. Each side reads the
    // value its peer attached, bumps it and switches back.
    let mut side = switch_to_new(64 * 1024, 1, |mut main: Context<i32>| {
        loop {
            let n = *main.data();
            println!("side got {}", n);
            if n >= 9 {
                return main;
            }
            main = main.switch(n + 1).unwrap().unwrap();
        }
    })
    .unwrap();

    while let Some(peer) = side {
        let n = *peer.data();
        println!("main got {}", n);
        side = peer.switch(n + 1).unwrap();
    }
}

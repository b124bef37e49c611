//! A two-stage pipeline on cooperative fibers: a producer context hands work
//! items to the main context, which turns each one into a shell command
//! whose output lands in a temporary directory.

use groundwork::fs::TempDir;
use groundwork::subprocess::system_command;
use groundwork::{switch_to_new, Context};

fn main() {
    let scratch = TempDir::new().unwrap();

    let mut producer = switch_to_new(64 * 1024, String::new(), |mut main: Context<String>| {
        for word in &["alpha", "beta", "gamma"] {
            main = main.switch(word.to_string()).unwrap().unwrap();
        }
        main
    })
    .unwrap();

    let mut outputs = Vec::new();
    while let Some(item) = producer {
        let word = item.data().clone();
        let out = scratch.path().join(format!("{}.txt", word));

        let status = system_command(&format!("echo {}", word), Some(&out), None, None).unwrap();
        assert!(status.success());
        outputs.push(out);

        producer = item.switch(String::new()).unwrap();
    }

    for out in outputs {
        print!("{}", std::fs::read_to_string(out).unwrap());
    }
}

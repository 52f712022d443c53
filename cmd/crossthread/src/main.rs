//! Cross-thread injection example
//!
//! A worker thread resolves a completion and schedules callbacks while the
//! reactor runs on the main thread. All hand-off goes through the async
//! queue and the wake pipe; the worker never touches reactor state.

use std::thread;
use std::time::Duration;

use kiln::{Completion, Reactor, NEVER, NOW};

fn main() -> kiln::Result<()> {
    env_logger::init();

    let reactor = Reactor::new()?;
    let start = kiln::monotonic();
    let completion: Completion<u64> = reactor.completion();

    println!("=== kiln cross-thread example ===\n");

    // A task that blocks on the completion. The reactor keeps running
    // while it waits.
    {
        let completion = completion.clone();
        let r = reactor.clone();
        let _ = reactor.register_callback(
            move |now| {
                println!("[waiter] waiting at t={:+.3}s", now - start);
                match completion.wait(now + 2.0, None) {
                    Some(value) => println!("[waiter] got {} from the worker", value),
                    None => println!("[waiter] timed out"),
                }
                r.end();
            },
            NOW,
        );
    }

    // The worker: sleeps on its own thread, then injects work.
    let worker = {
        let reactor = reactor.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            reactor.register_async_callback(
                move |now| println!("[worker] hello from the reactor thread at t={:+.3}s", now - start),
                NOW,
            );
            thread::sleep(Duration::from_millis(200));
            reactor.async_complete(&completion, 42);
        })
    };

    // Safety net if the worker dies before resolving.
    {
        let r = reactor.clone();
        reactor.register_timer(
            "halt",
            move |_| {
                r.end();
                NEVER
            },
            start + 5.0,
        );
    }

    reactor.run()?;
    worker.join().expect("worker thread panicked");

    println!("\n=== done ===");
    Ok(())
}

//! Basic kiln example
//!
//! Demonstrates timers, one-shot callbacks, and pausing a task mid-flight.
//! `KILN_DEMO_SECS` changes the run length, `KILN_POLLER` pins the poller
//! backend.

use kiln::{env_get, Reactor, NEVER, NOW};

fn main() -> kiln::Result<()> {
    env_logger::init();

    let run_secs: f64 = env_get("KILN_DEMO_SECS", 2.0);
    let reactor = Reactor::new()?;
    let start = kiln::monotonic();

    println!("=== kiln basic example ({}s) ===\n", run_secs);

    // A repeating timer: fires every 250ms until the reactor stops.
    reactor.register_timer(
        "heartbeat",
        move |now| {
            println!("[heartbeat] t={:+.3}s", now - start);
            now + 0.25
        },
        NOW,
    );

    // A one-shot callback that suspends itself for half a second. While it
    // sleeps, the heartbeat keeps running: the dispatch loop was handed to
    // another task.
    {
        let r = reactor.clone();
        let _ = reactor.register_callback(
            move |now| {
                println!("[sleeper]   going to sleep at t={:+.3}s", now - start);
                let resumed = r.pause(now + 0.5);
                println!("[sleeper]   back at t={:+.3}s", resumed - start);
            },
            start + 0.3,
        );
    }

    // A one-shot whose result arrives through a completion.
    let answer = reactor.register_callback(move |now| (now - start) * 1000.0, start + 0.6);

    // Stop after the configured run time.
    {
        let r = reactor.clone();
        reactor.register_timer(
            "halt",
            move |_| {
                r.end();
                NEVER
            },
            start + run_secs,
        );
    }

    reactor.run()?;

    if let Some(ms) = answer.wait(NOW, None) {
        println!("\ncompletion resolved: callback ran at +{:.0}ms", ms);
    }
    println!("=== done ===");
    Ok(())
}

//! Callback dispatch behavior: argument plumbing, data lending, and
//! registrations mutated from inside their own callbacks.

mod common;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use fdpoll::{Poller, Ready, Trigger};

use common::Pipe;

const WAIT: Option<Duration> = Some(Duration::from_millis(250));

#[test_log::test]
fn test_callback_receives_descriptor_and_data() {
    let pipe = Pipe::new();
    let mut poller: Poller<u32> = Poller::new().expect("Failed to create poller");

    let expected = pipe.write;
    poller
        .add(pipe.write, Trigger::Level, 0, move |_, fd, ready, data| {
            assert_eq!(fd, expected);
            assert!(ready.contains(Ready::WRITE));
            *data += 1;
        })
        .expect("Failed to register write end");
    poller.listen(pipe.write, Ready::WRITE);

    poller.wait(WAIT).expect("Failed to wait");
    assert_eq!(poller.data(pipe.write), Some(&1));
    poller.remove(pipe.write);
}

#[test_log::test]
fn test_data_is_lent_to_the_callback() {
    let pipe = Pipe::new();
    let mut poller: Poller<u32> = Poller::new().expect("Failed to create poller");
    let observed = Rc::new(Cell::new(false));

    let flag = observed.clone();
    poller
        .add(pipe.write, Trigger::Level, 7, move |poller, fd, _, _| {
            // While the callback runs, the entry's data lives in the
            // callback's own argument.
            flag.set(poller.data(fd).is_none());
        })
        .expect("Failed to register write end");
    poller.listen(pipe.write, Ready::WRITE);

    poller.wait(WAIT).expect("Failed to wait");
    assert!(observed.get());
    assert_eq!(poller.data(pipe.write), Some(&7), "Data returns after dispatch");
    poller.remove(pipe.write);
}

#[test_log::test]
fn test_callback_may_remove_its_own_registration() {
    let pipe = Pipe::new();
    let mut poller: Poller<()> = Poller::new().expect("Failed to create poller");
    let hits = Rc::new(Cell::new(0));

    let counter = hits.clone();
    poller
        .add(pipe.write, Trigger::Level, (), move |poller, fd, _, _| {
            counter.set(counter.get() + 1);
            poller.remove(fd);
        })
        .expect("Failed to register write end");
    poller.listen(pipe.write, Ready::WRITE);

    poller.wait(WAIT).expect("Failed to wait");
    assert_eq!(hits.get(), 1);
    assert!(poller.is_empty());

    poller
        .wait(Some(Duration::from_millis(50)))
        .expect("Failed to wait");
    assert_eq!(hits.get(), 1, "Removed registration must stay silent");
}

#[test_log::test]
fn test_event_for_descriptor_removed_mid_dispatch_is_discarded() {
    let a = Pipe::new();
    let b = Pipe::new();
    let mut poller: Poller<()> = Poller::new().expect("Failed to create poller");
    let hits_a = Rc::new(Cell::new(0));
    let hits_b = Rc::new(Cell::new(0));

    // Both write ends are ready, so one wait collects both events.
    // Whichever callback runs first removes the other descriptor; the
    // second event must then be dropped on the floor.
    for (fd, other, hits) in [
        (a.write, b.write, hits_a.clone()),
        (b.write, a.write, hits_b.clone()),
    ] {
        poller
            .add(fd, Trigger::Level, (), move |poller, _, _, _| {
                hits.set(hits.get() + 1);
                poller.remove(other);
            })
            .expect("Failed to register write end");
        poller.listen(fd, Ready::WRITE);
    }

    poller.wait(WAIT).expect("Failed to wait");
    assert_eq!(
        hits_a.get() + hits_b.get(),
        1,
        "Exactly one callback should run"
    );
    assert_eq!(poller.len(), 1);

    let survivors: Vec<_> = poller.descriptors().collect();
    for fd in survivors {
        poller.remove(fd);
    }
}

#[test_log::test]
fn test_readd_from_callback_invalidates_pending_events() {
    let a = Pipe::new();
    let b = Pipe::new();
    let mut poller: Poller<()> = Poller::new().expect("Failed to create poller");
    let hits_a = Rc::new(Cell::new(0));
    let hits_b = Rc::new(Cell::new(0));
    let readd_hits = Rc::new(Cell::new(0));

    // Each callback replaces the other registration outright. The
    // replacement gets a fresh generation, so the event already
    // collected for the old registration must not reach it.
    for (fd, other, hits) in [
        (a.write, b.write, hits_a.clone()),
        (b.write, a.write, hits_b.clone()),
    ] {
        let readd_hits = readd_hits.clone();
        poller
            .add(fd, Trigger::Level, (), move |poller, _, _, _| {
                hits.set(hits.get() + 1);
                poller.remove(other);
                let readd_hits = readd_hits.clone();
                poller
                    .add(other, Trigger::Level, (), move |_, _, _, _| {
                        readd_hits.set(readd_hits.get() + 1);
                    })
                    .expect("Failed to replace sibling registration");
                poller.listen(other, Ready::WRITE);
            })
            .expect("Failed to register write end");
        poller.listen(fd, Ready::WRITE);
    }

    poller.wait(WAIT).expect("Failed to wait");
    assert_eq!(hits_a.get() + hits_b.get(), 1);
    assert_eq!(
        readd_hits.get(),
        0,
        "The replacement must not see the stale event"
    );
    assert_eq!(poller.len(), 2);

    // Drop the registration that fired, leaving only the replacement.
    let fired = if hits_a.get() == 1 { a.write } else { b.write };
    poller.remove(fired);

    poller.wait(WAIT).expect("Failed to wait");
    assert_eq!(readd_hits.get(), 1, "The replacement fires on its own event");

    let survivors: Vec<_> = poller.descriptors().collect();
    for fd in survivors {
        poller.remove(fd);
    }
}

#[test_log::test]
fn test_readd_replaces_callback_in_place() {
    let pipe = Pipe::new();
    let mut poller: Poller<()> = Poller::new().expect("Failed to create poller");
    let old_hits = Rc::new(Cell::new(0));
    let new_hits = Rc::new(Cell::new(0));

    let counter = old_hits.clone();
    poller
        .add(pipe.write, Trigger::Level, (), move |_, _, _, _| {
            counter.set(counter.get() + 1);
        })
        .expect("Failed to register write end");
    poller.listen(pipe.write, Ready::WRITE);

    let counter = new_hits.clone();
    poller
        .add(pipe.write, Trigger::Level, (), move |_, _, _, _| {
            counter.set(counter.get() + 1);
        })
        .expect("Failed to re-register write end");

    poller.wait(WAIT).expect("Failed to wait");
    assert_eq!(old_hits.get(), 0, "The replaced callback must not run");
    assert_eq!(new_hits.get(), 1);
    assert_eq!(poller.len(), 1);
    poller.remove(pipe.write);
}

#[test_log::test]
fn test_readd_of_own_descriptor_from_callback_takes_effect() {
    let pipe = Pipe::new();
    let mut poller: Poller<()> = Poller::new().expect("Failed to create poller");
    let old_hits = Rc::new(Cell::new(0));
    let new_hits = Rc::new(Cell::new(0));

    let old = old_hits.clone();
    let new = new_hits.clone();
    poller
        .add(pipe.write, Trigger::Level, (), move |poller, fd, _, _| {
            old.set(old.get() + 1);
            let new = new.clone();
            poller
                .add(fd, Trigger::Level, (), move |_, _, _, _| {
                    new.set(new.get() + 1);
                })
                .expect("Failed to replace own registration");
            poller.listen(fd, Ready::WRITE);
        })
        .expect("Failed to register write end");
    poller.listen(pipe.write, Ready::WRITE);

    poller.wait(WAIT).expect("Failed to wait");
    assert_eq!(old_hits.get(), 1);
    assert_eq!(new_hits.get(), 0, "The replacement waits for the next cycle");

    poller.wait(WAIT).expect("Failed to wait");
    assert_eq!(old_hits.get(), 1, "The original callback is gone");
    assert_eq!(new_hits.get(), 1);
    poller.remove(pipe.write);
}

use axerrno::AxError;
use axnotify::{
    ListenerRef, ManagerConfig, Notification, NotificationListener, NotificationListenerTracker,
    NotificationManager, NotificationType, NotifyError, RemoteId, RemoteNotifier,
};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

type Record = Arc<Mutex<Vec<String>>>;

fn recording_manager(record: &Record) -> Arc<NotificationManager> {
    let on_subscribe = Arc::clone(record);
    let on_unsubscribe = Arc::clone(record);
    Arc::new(NotificationManager::new(
        ManagerConfig::new()
            .with_subscribe(move |remote_id, ty| {
                on_subscribe
                    .lock()
                    .unwrap()
                    .push(format!("+{},{}", remote_id.0, ty.name()));
                Ok(())
            })
            .with_unsubscribe(move |remote_id, ty| {
                on_unsubscribe
                    .lock()
                    .unwrap()
                    .push(format!("-{},{}", remote_id.0, ty.name()));
                Ok(())
            }),
    ))
}

fn counting_listener(counter: &Arc<AtomicU32>) -> ListenerRef<u32> {
    let counter = Arc::clone(counter);
    Arc::new(move |_: &Notification<u32>| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn test_manager_hook_sequence() {
    let record = Record::default();
    let manager = recording_manager(&record);
    let t1 = NotificationType::<u32>::new("T1");
    let counter = Arc::new(AtomicU32::new(0));
    let l1 = counting_listener(&counter);
    let l2 = counting_listener(&counter);

    manager
        .add_notification_listener(RemoteId(1), &t1, Arc::clone(&l1))
        .unwrap();
    assert_eq!(*record.lock().unwrap(), ["+1,T1"]);

    manager
        .add_notification_listener(RemoteId(1), &t1, Arc::clone(&l2))
        .unwrap();
    assert_eq!(*record.lock().unwrap(), ["+1,T1"]);

    manager
        .remove_notification_listener(RemoteId(1), &t1, &l1)
        .unwrap();
    assert_eq!(*record.lock().unwrap(), ["+1,T1"]);

    manager
        .remove_notification_listener(RemoteId(1), &t1, &l2)
        .unwrap();
    assert_eq!(*record.lock().unwrap(), ["+1,T1", "-1,T1"]);
}

#[test]
fn test_tracker_over_manager() {
    let record = Record::default();
    let manager = recording_manager(&record);
    let tracker = NotificationListenerTracker::new(Arc::clone(&manager));
    let type_a = NotificationType::<u32>::new("TypeA");
    let type_b = NotificationType::<u32>::new("TypeB");
    let hits = Arc::new(AtomicU32::new(0));

    tracker
        .add_notification_listener("session1", RemoteId(5), &type_a, counting_listener(&hits))
        .unwrap();
    tracker
        .add_notification_listener("session1", RemoteId(6), &type_b, counting_listener(&hits))
        .unwrap();
    tracker
        .add_notification_listener("session2", RemoteId(5), &type_a, counting_listener(&hits))
        .unwrap();

    // One subscription per (remote, type) even though two sessions listen.
    assert_eq!(*record.lock().unwrap(), ["+5,TypeA", "+6,TypeB"]);

    let sink = manager.as_listener::<u32>();
    sink.handle(&Notification::new(RemoteId(5), type_a.clone(), 1));
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    assert_eq!(tracker.remove_all(&"session1"), Ok(true));
    assert_eq!(*record.lock().unwrap(), ["+5,TypeA", "+6,TypeB", "-6,TypeB"]);
    assert_eq!(manager.remote_ids(), [RemoteId(5)]);

    sink.handle(&Notification::new(RemoteId(5), type_a.clone(), 1));
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    assert_eq!(tracker.remove_all(&"session1"), Ok(false));
    assert_eq!(tracker.remove_all(&"session2"), Ok(true));
    assert!(manager.remote_ids().is_empty());
    assert_eq!(
        *record.lock().unwrap(),
        ["+5,TypeA", "+6,TypeB", "-6,TypeB", "-5,TypeA"]
    );
}

#[test]
fn test_tracker_rolls_back_when_subscribe_fails() {
    let manager = Arc::new(NotificationManager::new(ManagerConfig::new().with_subscribe(
        |remote_id, _| {
            if remote_id == RemoteId(13) {
                Err(AxError::ConnectionRefused)
            } else {
                Ok(())
            }
        },
    )));
    let tracker = NotificationListenerTracker::new(Arc::clone(&manager));
    let type_a = NotificationType::<u32>::new("TypeA");
    let hits = Arc::new(AtomicU32::new(0));

    let err = tracker
        .add_notification_listener("g", RemoteId(13), &type_a, counting_listener(&hits))
        .unwrap_err();
    assert_eq!(err, NotifyError::remote(RemoteId(13), AxError::ConnectionRefused));
    assert!(tracker.is_empty());
    assert!(manager.remote_ids().is_empty());

    tracker
        .add_notification_listener("g", RemoteId(14), &type_a, counting_listener(&hits))
        .unwrap();
    assert_eq!(tracker.registration_count(&"g"), 1);
}

#[test]
fn test_concurrent_listeners_balance_hooks() {
    let subscribes = Arc::new(AtomicUsize::new(0));
    let unsubscribes = Arc::new(AtomicUsize::new(0));
    let manager = {
        let subscribes = Arc::clone(&subscribes);
        let unsubscribes = Arc::clone(&unsubscribes);
        Arc::new(NotificationManager::new(
            ManagerConfig::new()
                .with_subscribe(move |_, _| {
                    subscribes.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .with_unsubscribe(move |_, _| {
                    unsubscribes.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        ))
    };
    let ty = NotificationType::<u32>::new("state");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let manager = Arc::clone(&manager);
            let ty = ty.clone();
            thread::spawn(move || {
                let counter = Arc::new(AtomicU32::new(0));
                for round in 0..200 {
                    let remote = RemoteId((i + round) % 3);
                    let listener = counting_listener(&counter);
                    manager
                        .add_notification_listener(remote, &ty, Arc::clone(&listener))
                        .unwrap();
                    manager.handle_notification(&Notification::new(remote, ty.clone(), 0));
                    manager
                        .remove_notification_listener(remote, &ty, &listener)
                        .unwrap();
                }
                // Each listener saw at least its own notification.
                assert!(counter.load(Ordering::SeqCst) >= 200);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(manager.remote_ids().is_empty());
    assert_eq!(
        subscribes.load(Ordering::SeqCst),
        unsubscribes.load(Ordering::SeqCst)
    );
    assert!(subscribes.load(Ordering::SeqCst) >= 3);
}

#[test]
fn test_concurrent_groups_tear_down_cleanly() {
    let manager = Arc::new(NotificationManager::default());
    let tracker = Arc::new(NotificationListenerTracker::new(Arc::clone(&manager)));
    let types: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|name| NotificationType::<u32>::new(name))
        .collect();

    let handles: Vec<_> = (0..6u32)
        .map(|group| {
            let tracker = Arc::clone(&tracker);
            let types = types.clone();
            thread::spawn(move || {
                for round in 0..100i64 {
                    for (i, ty) in types.iter().enumerate() {
                        let listener: ListenerRef<u32> = Arc::new(|_: &Notification<u32>| {});
                        tracker
                            .add_notification_listener(group, RemoteId(round % 4 + i as i64), ty, listener)
                            .unwrap();
                    }
                    assert_eq!(tracker.registration_count(&group), types.len());
                    assert_eq!(tracker.remove_all(&group), Ok(true));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(tracker.is_empty());
    assert!(manager.remote_ids().is_empty());
}

use std::thread;
use std::time::Duration;

use axon::amp::Message;
use axon::Endpoint;

fn wait_a_bit() {
    thread::sleep(Duration::from_millis(100));
}

#[test]
fn push_pull_round_robins_across_pullers() {
    let _ = env_logger::try_init();

    let push = Endpoint::push_socket();
    let port = push.bind(0).unwrap();

    let pull_a = Endpoint::pull_socket();
    let pull_b = Endpoint::pull_socket();

    let received_a = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let received_b = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));

    let ra = received_a.clone();
    pull_a.on_message(move |msg| {
        ra.lock().unwrap().push(msg);
        None
    });
    let rb = received_b.clone();
    pull_b.on_message(move |msg| {
        rb.lock().unwrap().push(msg);
        None
    });

    pull_a.connect("127.0.0.1", port).unwrap();
    pull_b.connect("127.0.0.1", port).unwrap();
    wait_a_bit();

    for i in 0..4i64 {
        push.send(Message::new().push(i)).unwrap();
    }
    wait_a_bit();

    let total = received_a.lock().unwrap().len() + received_b.lock().unwrap().len();
    assert_eq!(total, 4);
    assert!(!received_a.lock().unwrap().is_empty());
    assert!(!received_b.lock().unwrap().is_empty());
}

#[test]
fn pub_sub_broadcasts_to_every_subscriber() {
    let _ = env_logger::try_init();

    let publisher = Endpoint::pub_socket();
    let port = publisher.bind(0).unwrap();

    let sub_a = Endpoint::sub_socket();
    let sub_b = Endpoint::sub_socket();

    let got_a = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let got_b = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));

    let ga = got_a.clone();
    sub_a.subscribe(".*", Box::new(move |_topic, _msg| { ga.fetch_add(1, std::sync::atomic::Ordering::SeqCst); })).unwrap();
    let gb = got_b.clone();
    sub_b.subscribe(".*", Box::new(move |_topic, _msg| { gb.fetch_add(1, std::sync::atomic::Ordering::SeqCst); })).unwrap();

    sub_a.connect("127.0.0.1", port).unwrap();
    sub_b.connect("127.0.0.1", port).unwrap();
    wait_a_bit();

    publisher.send(Message::new().push("news").push("hello")).unwrap();
    wait_a_bit();

    assert_eq!(got_a.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(got_b.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn sub_only_matches_subscribed_topic_pattern() {
    let _ = env_logger::try_init();

    let publisher = Endpoint::pub_socket();
    let port = publisher.bind(0).unwrap();

    let subscriber = Endpoint::sub_socket();
    let matched = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let m = matched.clone();
    subscriber.subscribe("^weather\\.", Box::new(move |topic, _msg| { m.lock().unwrap().push(topic.to_string()); })).unwrap();

    subscriber.connect("127.0.0.1", port).unwrap();
    wait_a_bit();

    publisher.send(Message::new().push("weather.paris").push(21i64)).unwrap();
    publisher.send(Message::new().push("sports.paris").push(1i64)).unwrap();
    wait_a_bit();

    assert_eq!(*matched.lock().unwrap(), vec!["weather.paris".to_string()]);
}

#[test]
fn request_reply_round_trips_through_the_replier_callback() {
    let _ = env_logger::try_init();

    let rep = Endpoint::rep_socket();
    let port = rep.bind(0).unwrap();
    rep.on_message(|req| {
        let echoed = req.first().and_then(|f| f.as_str()).unwrap_or("").to_owned();
        Some(Message::new().push(format!("echo:{echoed}")))
    });

    let req = Endpoint::req_socket();
    req.connect("127.0.0.1", port).unwrap();
    wait_a_bit();

    let reply = req.request(Message::new().push("ping"), Duration::from_secs(2)).unwrap();
    assert_eq!(reply.first().and_then(|f| f.as_str()), Some("echo:ping"));
}

#[test]
fn request_times_out_when_nobody_replies() {
    let _ = env_logger::try_init();

    let rep = Endpoint::rep_socket();
    let port = rep.bind(0).unwrap();
    // deliberately does not register a message callback, so every request goes unanswered

    let req = Endpoint::req_socket();
    req.connect("127.0.0.1", port).unwrap();
    wait_a_bit();

    let result = req.request(Message::new().push("ping"), Duration::from_millis(200));
    assert!(matches!(result, Err(axon::EngineError::ReplyTimeout)));
}

#[test]
fn connector_reconnects_after_listener_restarts() {
    let _ = env_logger::try_init();

    let pull = Endpoint::pull_socket();
    let received = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let r = received.clone();
    pull.on_message(move |_msg| {
        r.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        None
    });

    let push = Endpoint::push_socket();
    let port = push.bind(0).unwrap();
    pull.connect("127.0.0.1", port).unwrap();
    wait_a_bit();

    push.send(Message::new().push("first")).unwrap();
    wait_a_bit();
    assert_eq!(received.load(std::sync::atomic::Ordering::SeqCst), 1);

    // drop the listener side; the connector should keep retrying in the background
    drop(push);
    wait_a_bit();

    let push2 = Endpoint::push_socket();
    push2.bind(port).unwrap();
    thread::sleep(Duration::from_secs(1));

    push2.send(Message::new().push("second")).unwrap();
    wait_a_bit();
    assert_eq!(received.load(std::sync::atomic::Ordering::SeqCst), 2);
}

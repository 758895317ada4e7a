use std::{
    io::Cursor,
    net::{SocketAddr, UdpSocket},
    thread,
    time::Duration,
};

use idmwire::{
    child::{exit_code, Child, ChildConfig, PrivilegedAction, EXIT_FAILURE, EXIT_SUCCESS},
    frame::{RequestFrame, ResponseFrame},
    resolver::SyncResolver,
    srv::SrvRecord,
    Error, DNS_BUFFER_SIZE,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Turns a query into a response carrying `answers` (raw resource records).
fn respond(query: &[u8], ancount: u16, answers: &[u8]) -> Vec<u8> {
    let mut msg = query.to_vec();
    msg[2] |= 0x80; // QR
    msg[3] = 0x80; // RA
    msg[6..8].copy_from_slice(&ancount.to_be_bytes());
    msg.extend_from_slice(answers);
    msg
}

fn srv_answer(priority: u16, weight: u16, port: u16, target: &[&str]) -> Vec<u8> {
    let mut rdata = Vec::new();
    rdata.extend_from_slice(&priority.to_be_bytes());
    rdata.extend_from_slice(&weight.to_be_bytes());
    rdata.extend_from_slice(&port.to_be_bytes());
    for label in target {
        rdata.push(label.len() as u8);
        rdata.extend_from_slice(label.as_bytes());
    }
    rdata.push(0);

    // Owner name is a pointer to the question name.
    let mut rr = vec![0xc0, 0x0c, 0x00, 0x21, 0x00, 0x01, 0x00, 0x00, 0x0e, 0x10];
    rr.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    rr.extend_from_slice(&rdata);
    rr
}

/// Spawns a fake name server that answers a single query using `answer`.
fn fake_server(
    answer: impl FnOnce(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
) -> (SocketAddr, thread::JoinHandle<()>) {
    let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = sock.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let mut buf = [0; DNS_BUFFER_SIZE];
        let (len, peer) = sock.recv_from(&mut buf).unwrap();
        for msg in answer(&buf[..len]) {
            sock.send_to(&msg, peer).unwrap();
        }
    });
    (addr, handle)
}

#[test]
fn resolve_srv_records() {
    init_logger();

    let (addr, server) = fake_server(|query| {
        let mut answers = srv_answer(0, 100, 389, &["dc1", "example", "com"]);
        // A CNAME in between must not throw off the next record.
        answers.extend_from_slice(&[
            0xc0, 0x0c, 0x00, 0x05, 0x00, 0x01, 0x00, 0x00, 0x0e, 0x10, 0x00, 0x02, 0xc0, 0x0c,
        ]);
        answers.extend_from_slice(&srv_answer(10, 0, 389, &["dc2", "example", "com"]));
        vec![respond(query, 3, &answers)]
    });

    let mut resolver = SyncResolver::new(addr).unwrap();
    resolver.set_timeout(Duration::from_secs(5)).unwrap();
    let reply = resolver.resolve_srv("_ldap._tcp.example.com").unwrap();
    server.join().unwrap();

    assert_eq!(reply.answer_count(), 3);
    assert_eq!(
        reply.into_records(),
        [
            SrvRecord {
                priority: 0,
                weight: 100,
                port: 389,
                host: "dc1.example.com".into(),
            },
            SrvRecord {
                priority: 10,
                weight: 0,
                port: 389,
                host: "dc2.example.com".into(),
            },
        ]
    );
}

#[test]
fn resolve_skips_garbage_and_foreign_ids() {
    init_logger();

    let (addr, server) = fake_server(|query| {
        let mut wrong_id = respond(query, 1, &srv_answer(1, 1, 1, &["wrong"]));
        wrong_id[0] ^= 0xff;
        let garbage = respond(query, 1, &[0xc0]);
        let good = respond(query, 1, &srv_answer(5, 5, 88, &["kdc", "example", "com"]));
        vec![wrong_id, garbage, good]
    });

    let mut resolver = SyncResolver::new(addr).unwrap();
    resolver.set_timeout(Duration::from_secs(5)).unwrap();
    let reply = resolver.resolve_srv("_kerberos._udp.example.com.").unwrap();
    server.join().unwrap();

    assert_eq!(reply.len(), 1);
    assert_eq!(reply.records()[0].host, "kdc.example.com");
    assert_eq!(reply.records()[0].port, 88);
}

#[test]
fn resolve_no_data() {
    init_logger();

    let (addr, server) = fake_server(|query| vec![respond(query, 0, &[])]);

    let mut resolver = SyncResolver::new(addr).unwrap();
    resolver.set_timeout(Duration::from_secs(5)).unwrap();
    let reply = resolver.resolve_srv("_ldap._tcp.example.com").unwrap();
    server.join().unwrap();

    assert!(reply.is_empty());
    assert_eq!(reply.answer_count(), 0);
}

#[test]
fn resolve_skips_failing_servers() {
    init_logger();

    let (failing, failing_server) = fake_server(|query| {
        let mut servfail = respond(query, 0, &[]);
        servfail[3] |= 0x02;
        vec![servfail]
    });
    let (good, good_server) = fake_server(|query| {
        thread::sleep(Duration::from_millis(100));
        vec![respond(
            query,
            1,
            &srv_answer(0, 0, 636, &["ipa", "example", "com"]),
        )]
    });

    let mut resolver = SyncResolver::new(failing).unwrap();
    resolver.add_server(good);
    resolver.set_timeout(Duration::from_secs(5)).unwrap();
    let reply = resolver.resolve_srv("_ldaps._tcp.example.com").unwrap();
    failing_server.join().unwrap();
    good_server.join().unwrap();

    assert_eq!(reply.len(), 1);
    assert_eq!(reply.records()[0].host, "ipa.example.com");
    assert_eq!(reply.records()[0].port, 636);
}

#[test]
fn query_ids_are_unpredictable() {
    init_logger();

    const QUERIES: usize = 8;
    let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = sock.local_addr().unwrap();
    let server = thread::spawn(move || {
        let mut ids = Vec::new();
        let mut buf = [0; DNS_BUFFER_SIZE];
        for _ in 0..QUERIES {
            let (len, peer) = sock.recv_from(&mut buf).unwrap();
            let query = &buf[..len];
            ids.push(u16::from_be_bytes([query[0], query[1]]));
            sock.send_to(&respond(query, 0, &[]), peer).unwrap();
        }
        ids
    });

    let mut resolver = SyncResolver::new(addr).unwrap();
    resolver.set_timeout(Duration::from_secs(5)).unwrap();
    for _ in 0..QUERIES {
        assert!(resolver.resolve_srv("_ldap._tcp.example.com").unwrap().is_empty());
    }
    let ids = server.join().unwrap();

    assert_eq!(ids.len(), QUERIES);
    assert!(
        ids.windows(2).any(|w| w[1] != w[0].wrapping_add(1)),
        "sequential query IDs: {:?}",
        ids
    );
}

#[test]
fn resolve_nxdomain_is_empty() {
    init_logger();

    let (addr, server) = fake_server(|query| {
        let mut nxdomain = respond(query, 0, &[]);
        nxdomain[3] |= 0x03;
        vec![nxdomain]
    });

    let mut resolver = SyncResolver::new(addr).unwrap();
    resolver.set_timeout(Duration::from_secs(5)).unwrap();
    let reply = resolver.resolve_srv("_ldap._tcp.nowhere.example").unwrap();
    server.join().unwrap();

    assert!(reply.is_empty());
}

struct SetLogin {
    invoked: bool,
    status: u32,
}

impl PrivilegedAction for SetLogin {
    fn invoke(&mut self, username: &str, seuser: &str, mls_range: &str) -> Result<u32, Error> {
        assert_eq!(
            (username, seuser, mls_range),
            ("alice", "unconfined_u", "s0-s0:c0.c1023")
        );
        self.invoked = true;
        Ok(self.status)
    }
}

#[test]
fn helper_round_trip() {
    init_logger();

    let request = RequestFrame::new("unconfined_u", "s0-s0:c0.c1023", "alice")
        .encode()
        .unwrap();
    let mut action = SetLogin {
        invoked: false,
        status: 0,
    };
    let mut child = Child::new(
        ChildConfig::default(),
        Cursor::new(request),
        Vec::new(),
        &mut action,
    );
    let result = child.run();
    assert_eq!(exit_code(&result), EXIT_SUCCESS);
    assert_eq!(
        ResponseFrame::decode(child.output()),
        Ok(ResponseFrame::new(0))
    );
    drop(child);
    assert!(action.invoked);
}

#[test]
fn helper_rejects_truncated_request() {
    init_logger();

    let mut request = RequestFrame::new("unconfined_u", "s0-s0:c0.c1023", "alice")
        .encode()
        .unwrap();
    // Claim a longer username than is present.
    let len = request.len();
    request[len - 9..len - 5].copy_from_slice(&100u32.to_be_bytes());

    let mut action = SetLogin {
        invoked: false,
        status: 0,
    };
    let mut child = Child::new(
        ChildConfig::default(),
        Cursor::new(request),
        Vec::new(),
        &mut action,
    );
    let result = child.run();
    assert_eq!(result, Err(Error::InvalidArgument));
    assert_eq!(exit_code(&result), EXIT_FAILURE);
    assert!(child.output().is_empty());
    drop(child);
    assert!(!action.invoked);
}

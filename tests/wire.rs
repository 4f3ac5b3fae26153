//! End-to-end protocol tests against a scripted server double.
//!
//! Each test binds a listener, runs a canned server conversation on a
//! thread, and drives the public client API against it. Script-side
//! assertions surface through the final `join`.

mod common;

use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use common::*;
use mywire::scramble::{scramble_323, scramble_41};
use mywire::{Conn, Error, Value};

#[test]
fn secure_auth_handshake_and_ping() {
    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);
        serve_ping(stream);
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();
    assert!(conn.connected());
    assert_eq!(conn.server_version(), "5.1.73-double");
    conn.ping().unwrap();
    conn.close().unwrap();
    assert!(!conn.connected());
    server.join().unwrap();
}

#[test]
fn old_password_downgrade() {
    let (port, server) = spawn_server(|stream| {
        send_packet(stream, 0, &init_payload());
        let (seq, _auth) = recv_packet(stream);
        assert_eq!(seq, 1);

        // Bare EOF: switch to the 3.23 scramble.
        send_packet(stream, 2, &[0xFE]);

        let (seq, old) = recv_packet(stream);
        assert_eq!(seq, 3);
        let expected = scramble_323(&SEED[..8], PASSWORD);
        assert_eq!(&old[..old.len() - 1], expected.as_slice());
        assert_eq!(old.last(), Some(&0));
        send_packet(stream, 4, &ok_payload(0, 0, 0x0002, 0));

        serve_ping(stream);
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();
    assert!(conn.connected());
    conn.ping().unwrap();
    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn rejected_credentials_surface_the_server_error() {
    let (port, server) = spawn_server(|stream| {
        send_packet(stream, 0, &init_payload());
        let (_seq, _auth) = recv_packet(stream);
        send_packet(
            stream,
            2,
            &err_payload(1045, "28000", "Access denied for user 'app'"),
        );
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    match conn.connect().unwrap_err() {
        Error::Server(e) => {
            assert_eq!(e.code, 1045);
            assert_eq!(e.sqlstate, "28000");
        }
        other => panic!("expected server error, got {other:?}"),
    }
    assert!(!conn.connected());
    server.join().unwrap();
}

#[test]
fn pre_41_server_demotes_the_protocol() {
    // Server without the 4.1 capability: transactions + long-flag only.
    const CAPS: u16 = 0x0004 | 0x2000;

    let (port, server) = spawn_server(|stream| {
        send_packet(stream, 0, &init_payload_with_caps(CAPS));

        let (seq, auth) = recv_packet(stream);
        assert_eq!(seq, 1);
        // 3.23 layout: flags(2), max-packet(3), user(nul), token, filler.
        let flags = u16::from_le_bytes(auth[0..2].try_into().unwrap());
        assert_eq!(flags & 0x0200, 0, "protocol 41 must not be requested");
        assert_eq!(flags & 0x0004, 0x0004, "long-flag mirrored");
        assert_eq!(flags & 0x2000, 0x2000, "transactions mirrored");
        assert_eq!(&auth[5..9], b"app\0");
        let token = &auth[9..auth.len() - 1];
        assert_eq!(token, scramble_323(&SEED[..8], PASSWORD).as_slice());
        assert_eq!(auth.last(), Some(&0));

        send_packet(stream, 2, &ok_payload_40(0, 0, 0x0002));

        // Ping, answered in the short pre-4.1 OK form.
        let (seq, cmd) = recv_packet(stream);
        assert_eq!((seq, cmd.as_slice()), (0, &[0x0E][..]));
        send_packet(stream, 1, &ok_payload_40(0, 0, 0x0002));
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();
    conn.ping().unwrap();
    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn query_with_stored_rows() {
    const SQL: &str = "SELECT 1 AS n UNION SELECT 2";

    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);

        let (seq, cmd) = recv_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(cmd[0], 0x03);
        assert_eq!(&cmd[1..], SQL.as_bytes());

        send_packet(stream, 1, &[0x01]); // one field
        send_packet(stream, 2, &field_payload("n", 0x08, 0));
        send_packet(stream, 3, &eof_payload(0x0002));
        send_packet(stream, 4, &text_row(&[b"1"]));
        send_packet(stream, 5, &text_row(&[b"2"]));
        send_packet(stream, 6, &eof_payload(0x0002));

        serve_ping(stream);
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();
    conn.query(SQL).unwrap();

    let mut result = conn.store_result().unwrap();
    assert_eq!(result.field_count(), 1);
    assert_eq!(result.fields()[0].name, "n");
    assert_eq!(result.row_count(), Some(2));

    let row = result.fetch_row().unwrap().unwrap();
    assert_eq!(row.values(), &[Value::BigInt(1)]);
    let row = result.fetch_row().unwrap().unwrap();
    assert_eq!(row.values(), &[Value::BigInt(2)]);
    assert!(result.fetch_row().unwrap().is_none());
    result.free().unwrap();

    // The session accepts commands again.
    conn.ping().unwrap();
    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn prepared_select_with_int_params() {
    const SQL: &str = "SELECT id FROM t WHERE id BETWEEN ? AND ?";

    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);

        // Prepare
        let (seq, cmd) = recv_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(cmd[0], 0x16);
        assert_eq!(&cmd[1..], SQL.as_bytes());

        let mut prepare_ok = vec![0x00];
        prepare_ok.extend_from_slice(&7u32.to_le_bytes()); // statement id
        prepare_ok.extend_from_slice(&1u16.to_le_bytes()); // columns
        prepare_ok.extend_from_slice(&2u16.to_le_bytes()); // params
        prepare_ok.push(0);
        prepare_ok.extend_from_slice(&0u16.to_le_bytes()); // warnings
        send_packet(stream, 1, &prepare_ok);
        // Two parameter descriptors (opaque to the client) + EOF
        send_packet(stream, 2, &field_payload("?", 0xFD, 0));
        send_packet(stream, 3, &field_payload("?", 0xFD, 0));
        send_packet(stream, 4, &eof_payload(0x0002));
        // One column descriptor + EOF
        send_packet(stream, 5, &field_payload("id", 0x03, 0));
        send_packet(stream, 6, &eof_payload(0x0002));

        // Execute
        let (seq, cmd) = recv_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(cmd[0], 0x17);
        assert_eq!(u32::from_le_bytes(cmd[1..5].try_into().unwrap()), 7);
        assert_eq!(cmd[5], 0x00); // no cursor
        assert_eq!(u32::from_le_bytes(cmd[6..10].try_into().unwrap()), 1);
        assert_eq!(cmd[10], 0x00); // null bitmap: nothing null
        assert_eq!(cmd[11], 0x01); // new-params-bound
        assert_eq!(&cmd[12..16], &[0x03, 0x00, 0x03, 0x00]); // LONG, LONG
        assert_eq!(&cmd[16..20], &1i32.to_le_bytes());
        assert_eq!(&cmd[20..24], &5i32.to_le_bytes());

        send_packet(stream, 1, &[0x01]);
        send_packet(stream, 2, &field_payload("id", 0x03, 0));
        send_packet(stream, 3, &eof_payload(0x0002));
        let mut seq = 4;
        for id in [2i32, 4] {
            let mut row = vec![0x00, 0x00]; // header + null bitmap
            row.extend_from_slice(&id.to_le_bytes());
            send_packet(stream, seq, &row);
            seq += 1;
        }
        send_packet(stream, seq, &eof_payload(0x0002));

        // Statement close (no reply)
        let (seq, cmd) = recv_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(cmd[0], 0x19);
        assert_eq!(u32::from_le_bytes(cmd[1..5].try_into().unwrap()), 7);

        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();

    let mut stmt = conn.prepare(SQL).unwrap();
    assert_eq!(stmt.param_count(), 2);
    assert_eq!(stmt.column_count(), 1);

    stmt.bind_params(&[Value::Int(1), Value::Int(5)]).unwrap();
    stmt.execute().unwrap();

    let mut result = conn.use_result().unwrap();
    assert_eq!(result.field_count(), 1);
    assert_eq!(result.row_count(), None); // streaming

    let row = result.fetch_row().unwrap().unwrap();
    assert_eq!(row.values(), &[Value::Int(2)]);
    let row = result.fetch_row().unwrap().unwrap();
    assert_eq!(row.values(), &[Value::Int(4)]);
    assert!(result.fetch_row().unwrap().is_none());
    result.free().unwrap();

    stmt.close().unwrap();
    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn sequence_corruption_is_fatal() {
    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);
        let (_seq, cmd) = recv_packet(stream);
        assert_eq!(cmd, [0x0E]);
        // Expected sequence is 1; send 2.
        send_packet(stream, 2, &ok_payload(0, 0, 0x0002, 0));
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();
    let err = conn.ping().unwrap_err();
    assert!(matches!(err, Error::CommandsOutOfSync), "{err:?}");
    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn reconnect_retries_query_once() {
    const SQL: &str = "UPDATE t SET x = 1";

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        // First connection: handshake, then die on the query without
        // emitting a single response byte.
        let (mut first, _) = listener.accept().unwrap();
        serve_handshake(&mut first);
        let (_seq, cmd) = recv_packet(&mut first);
        assert_eq!(cmd[0], 0x03);
        drop(first);

        // Second connection: fresh handshake, same query, real answer.
        let (mut second, _) = listener.accept().unwrap();
        serve_handshake(&mut second);
        let (seq, cmd) = recv_packet(&mut second);
        assert_eq!(seq, 0);
        assert_eq!(&cmd[1..], SQL.as_bytes());
        send_packet(&mut second, 1, &ok_payload(3, 0, 0x0002, 0));
        drain(&mut second);
    });

    let mut opts = test_opts(port);
    opts.reconnect = true;
    opts.reconnect_attempts = 3;
    opts.reconnect_delay = Duration::from_millis(10);

    let conn = Conn::new(opts);
    conn.connect().unwrap();
    conn.query(SQL).unwrap();
    assert_eq!(conn.affected_rows(), 3);
    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn update_produces_no_result_set() {
    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);
        let (_seq, cmd) = recv_packet(stream);
        assert_eq!(cmd[0], 0x03);
        send_packet(stream, 1, &ok_payload(5, 9, 0x0002, 1));
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();
    conn.query("UPDATE t SET x = x + 1").unwrap();
    assert_eq!(conn.affected_rows(), 5);
    assert_eq!(conn.last_insert_id(), 9);
    assert_eq!(conn.warning_count(), 1);

    let err = conn.store_result().unwrap_err();
    assert!(matches!(err, Error::NoResultSet), "{err:?}");
    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn used_result_pins_the_session() {
    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);
        let (_seq, cmd) = recv_packet(stream);
        assert_eq!(cmd[0], 0x03);
        send_packet(stream, 1, &[0x01]);
        send_packet(stream, 2, &field_payload("v", 0x03, 0));
        send_packet(stream, 3, &eof_payload(0x0002));
        send_packet(stream, 4, &text_row(&[b"10"]));
        send_packet(stream, 5, &eof_payload(0x0002));
        serve_ping(stream);
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();
    conn.query("SELECT v FROM t").unwrap();

    let mut result = conn.use_result().unwrap();

    // Any command between use_result and free is out of sync.
    let err = conn.ping().unwrap_err();
    assert!(matches!(err, Error::CommandsOutOfSync), "{err:?}");
    let err = conn.query("SELECT 1").unwrap_err();
    assert!(matches!(err, Error::CommandsOutOfSync), "{err:?}");

    let row = result.fetch_row().unwrap().unwrap();
    assert_eq!(row.values(), &[Value::Int(10)]);
    assert!(result.fetch_row().unwrap().is_none());
    result.free().unwrap();

    conn.ping().unwrap();
    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn multi_statement_results_stream() {
    const MORE: u16 = 0x0002 | 0x0008;

    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);
        let (_seq, cmd) = recv_packet(stream);
        assert_eq!(cmd[0], 0x03);

        // First result set, flagged more-results-exist.
        send_packet(stream, 1, &[0x01]);
        send_packet(stream, 2, &field_payload("a", 0x03, 0));
        send_packet(stream, 3, &eof_payload(MORE));
        send_packet(stream, 4, &text_row(&[b"1"]));
        send_packet(stream, 5, &eof_payload(MORE));

        // Second result set continues the same sequence.
        send_packet(stream, 6, &[0x01]);
        send_packet(stream, 7, &field_payload("b", 0x03, 0));
        send_packet(stream, 8, &eof_payload(0x0002));
        send_packet(stream, 9, &text_row(&[b"2"]));
        send_packet(stream, 10, &eof_payload(0x0002));

        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();
    conn.query("SELECT 1; SELECT 2").unwrap();

    let mut first = conn.store_result().unwrap();
    assert_eq!(first.fields()[0].name, "a");
    assert_eq!(
        first.fetch_row().unwrap().unwrap().values(),
        &[Value::Int(1)]
    );
    first.free().unwrap();

    assert!(conn.more_results());
    assert!(conn.next_result().unwrap());

    let mut second = conn.store_result().unwrap();
    assert_eq!(second.fields()[0].name, "b");
    assert_eq!(
        second.fetch_row().unwrap().unwrap().values(),
        &[Value::Int(2)]
    );
    second.free().unwrap();

    assert!(!conn.more_results());
    let err = conn.next_result().unwrap_err();
    assert!(matches!(err, Error::CommandsOutOfSync), "{err:?}");

    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn server_errors_leave_the_session_usable() {
    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);
        let (_seq, cmd) = recv_packet(stream);
        assert_eq!(cmd[0], 0x03);
        send_packet(
            stream,
            1,
            &err_payload(1146, "42S02", "Table 'shop.t' doesn't exist"),
        );
        serve_ping(stream);
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();

    match conn.query("SELECT * FROM t").unwrap_err() {
        Error::Server(e) => {
            assert_eq!(e.code, 1146);
            assert_eq!(e.sqlstate, "42S02");
            assert_eq!(e.message, "Table 'shop.t' doesn't exist");
        }
        other => panic!("expected server error, got {other:?}"),
    }

    conn.ping().unwrap();
    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn fetch_map_keys_rows_by_field_name() {
    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);
        let (_seq, cmd) = recv_packet(stream);
        assert_eq!(cmd[0], 0x03);
        send_packet(stream, 1, &[0x02]);
        send_packet(stream, 2, &field_payload("id", 0x03, 0));
        send_packet(stream, 3, &field_payload("name", 0xFD, 0));
        send_packet(stream, 4, &eof_payload(0x0002));
        send_packet(stream, 5, &text_row(&[b"3", b"ada"]));
        send_packet(stream, 6, &eof_payload(0x0002));
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();
    conn.query("SELECT id, name FROM u").unwrap();

    let mut result = conn.store_result().unwrap();
    let map = result.fetch_map().unwrap().unwrap();
    assert_eq!(map["id"], Value::Int(3));
    assert_eq!(map["name"], Value::Text("ada".to_string()));
    assert!(result.fetch_map().unwrap().is_none());
    result.free().unwrap();

    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn connect_state_errors() {
    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    // Commands on an idle session fail fast.
    assert!(matches!(conn.ping().unwrap_err(), Error::ServerGone));

    conn.connect().unwrap();
    assert!(matches!(
        conn.connect().unwrap_err(),
        Error::AlreadyConnected
    ));
    conn.close().unwrap();
    // Close is idempotent.
    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn statement_misuse_is_recoverable() {
    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);

        let (_seq, cmd) = recv_packet(stream);
        assert_eq!(cmd[0], 0x16);
        let mut prepare_ok = vec![0x00];
        prepare_ok.extend_from_slice(&3u32.to_le_bytes());
        prepare_ok.extend_from_slice(&0u16.to_le_bytes()); // columns
        prepare_ok.extend_from_slice(&1u16.to_le_bytes()); // params
        prepare_ok.push(0);
        prepare_ok.extend_from_slice(&0u16.to_le_bytes());
        send_packet(stream, 1, &prepare_ok);
        send_packet(stream, 2, &field_payload("?", 0xFD, 0));
        send_packet(stream, 3, &eof_payload(0x0002));

        // The eventual well-formed execute.
        let (_seq, cmd) = recv_packet(stream);
        assert_eq!(cmd[0], 0x17);
        send_packet(stream, 1, &ok_payload(1, 0, 0x0002, 0));

        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();

    // Unprepared handles refuse everything.
    let mut raw = conn.init_stmt();
    assert!(matches!(raw.execute().unwrap_err(), Error::NoPrepareStmt));
    assert!(matches!(
        raw.bind_params(&[Value::Int(1)]).unwrap_err(),
        Error::NoPrepareStmt
    ));

    let mut stmt = conn.prepare("INSERT INTO t (x) VALUES (?)").unwrap();

    // Execute before binding.
    assert!(matches!(
        stmt.execute().unwrap_err(),
        Error::ParamsNotBound
    ));

    // Arity mismatch.
    match stmt.bind_params(&[Value::Int(1), Value::Int(2)]).unwrap_err() {
        Error::InvalidParameterNo { expected, actual } => {
            assert_eq!((expected, actual), (1, 2));
        }
        other => panic!("unexpected {other:?}"),
    }

    // Unencodable parameter kind.
    assert!(matches!(
        stmt.bind_params(&[Value::Decimal("1.5".into())]).unwrap_err(),
        Error::UnsupportedParamType(0)
    ));

    stmt.bind_params(&[Value::Int(42)]).unwrap();
    stmt.execute().unwrap();
    assert_eq!(stmt.affected_rows(), 1);

    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn reconnect_invalidates_statements() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut first, _) = listener.accept().unwrap();
        serve_handshake(&mut first);

        // Prepare a parameterless statement.
        let (_seq, cmd) = recv_packet(&mut first);
        assert_eq!(cmd[0], 0x16);
        let mut prepare_ok = vec![0x00];
        prepare_ok.extend_from_slice(&5u32.to_le_bytes());
        prepare_ok.extend_from_slice(&0u16.to_le_bytes());
        prepare_ok.extend_from_slice(&0u16.to_le_bytes());
        prepare_ok.push(0);
        prepare_ok.extend_from_slice(&0u16.to_le_bytes());
        send_packet(&mut first, 1, &prepare_ok);

        // Die on the ping.
        let (_seq, cmd) = recv_packet(&mut first);
        assert_eq!(cmd, [0x0E]);
        drop(first);

        // The retried ping arrives on a fresh connection.
        let (mut second, _) = listener.accept().unwrap();
        serve_handshake(&mut second);
        serve_ping(&mut second);
        drain(&mut second);
    });

    let mut opts = test_opts(port);
    opts.reconnect = true;
    opts.reconnect_attempts = 3;
    opts.reconnect_delay = Duration::from_millis(10);

    let conn = Conn::new(opts);
    conn.connect().unwrap();
    let mut stmt = conn.prepare("SELECT NOW()").unwrap();

    // Ping rides through the reconnect...
    conn.ping().unwrap();
    // ...but the statement handle did not survive it.
    let err = stmt.execute().unwrap_err();
    assert!(matches!(err, Error::StatementInvalidated), "{err:?}");
    assert!(stmt.close().is_ok());

    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn change_user_reauthenticates_in_place() {
    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);

        // Prepare something to witness the invalidation.
        let (_seq, cmd) = recv_packet(stream);
        assert_eq!(cmd[0], 0x16);
        let mut prepare_ok = vec![0x00];
        prepare_ok.extend_from_slice(&8u32.to_le_bytes());
        prepare_ok.extend_from_slice(&0u16.to_le_bytes());
        prepare_ok.extend_from_slice(&0u16.to_le_bytes());
        prepare_ok.push(0);
        prepare_ok.extend_from_slice(&0u16.to_le_bytes());
        send_packet(stream, 1, &prepare_ok);

        // Change-user command.
        let (seq, cmd) = recv_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(cmd[0], 0x11);
        assert_eq!(&cmd[1..7], b"admin\0");
        assert_eq!(cmd[7], 20); // token length
        let token = &cmd[8..28];
        assert_eq!(token, scramble_41(SEED, "s3cret").as_slice());
        assert_eq!(&cmd[28..32], b"etl\0");
        assert_eq!(&cmd[32..34], &33u16.to_le_bytes());
        send_packet(stream, 1, &ok_payload(0, 0, 0x0002, 0));

        serve_ping(stream);
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();
    let mut stmt = conn.prepare("SELECT 1").unwrap();

    conn.change_user("admin", "s3cret", Some("etl")).unwrap();

    // Server-side statements were discarded by the change.
    let err = stmt.execute().unwrap_err();
    assert!(matches!(err, Error::StatementInvalidated), "{err:?}");

    conn.ping().unwrap();
    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn field_list_returns_descriptors() {
    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);

        let (seq, cmd) = recv_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(cmd[0], 0x04);
        assert_eq!(&cmd[1..], b"orders\0id%");

        send_packet(stream, 1, &field_payload("id", 0x03, 0x0002));
        send_packet(stream, 2, &field_payload("id_ref", 0x03, 0));
        send_packet(stream, 3, &eof_payload(0x0002));
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();

    let fields = conn.field_list("orders", Some("id%")).unwrap();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "id");
    assert_eq!(fields[1].name, "id_ref");

    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn statistics_returns_the_raw_line() {
    const LINE: &str = "Uptime: 500  Threads: 1  Questions: 4";

    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);
        let (seq, cmd) = recv_packet(stream);
        assert_eq!((seq, cmd.as_slice()), (0, &[0x09][..]));
        send_packet(stream, 1, LINE.as_bytes());
        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();
    assert_eq!(conn.statistics().unwrap(), LINE);
    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn long_data_streams_in_chunks() {
    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);

        // Prepare: two string parameters, no columns.
        let (_seq, cmd) = recv_packet(stream);
        assert_eq!(cmd[0], 0x16);
        let mut prepare_ok = vec![0x00];
        prepare_ok.extend_from_slice(&4u32.to_le_bytes());
        prepare_ok.extend_from_slice(&0u16.to_le_bytes());
        prepare_ok.extend_from_slice(&2u16.to_le_bytes());
        prepare_ok.push(0);
        prepare_ok.extend_from_slice(&0u16.to_le_bytes());
        send_packet(stream, 1, &prepare_ok);
        send_packet(stream, 2, &field_payload("?", 0xFD, 0));
        send_packet(stream, 3, &field_payload("?", 0xFD, 0));
        send_packet(stream, 4, &eof_payload(0x0002));

        // One long-data packet for parameter 1; no response follows.
        let (seq, cmd) = recv_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(cmd[0], 0x18);
        assert_eq!(u32::from_le_bytes(cmd[1..5].try_into().unwrap()), 4);
        assert_eq!(u16::from_le_bytes(cmd[5..7].try_into().unwrap()), 1);
        assert_eq!(&cmd[7..], b"a large body");

        // Execute follows directly.
        let (seq, cmd) = recv_packet(stream);
        assert_eq!(seq, 0);
        assert_eq!(cmd[0], 0x17);
        send_packet(stream, 1, &ok_payload(1, 0, 0x0002, 0));

        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();

    let mut stmt = conn.prepare("INSERT INTO docs VALUES (?, ?)").unwrap();
    stmt.bind_params(&[Value::Text("title".into()), Value::Text(String::new())])
        .unwrap();

    // Long data only applies to string/blob parameters.
    assert!(matches!(
        stmt.send_long_data(5, b"x").unwrap_err(),
        Error::InvalidParameterNo { .. }
    ));

    stmt.send_long_data(1, b"a large body").unwrap();
    stmt.execute().unwrap();
    assert_eq!(stmt.affected_rows(), 1);

    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn long_data_rejects_non_string_params() {
    let (port, server) = spawn_server(|stream| {
        serve_handshake(stream);

        let (_seq, cmd) = recv_packet(stream);
        assert_eq!(cmd[0], 0x16);
        let mut prepare_ok = vec![0x00];
        prepare_ok.extend_from_slice(&6u32.to_le_bytes());
        prepare_ok.extend_from_slice(&0u16.to_le_bytes());
        prepare_ok.extend_from_slice(&1u16.to_le_bytes());
        prepare_ok.push(0);
        prepare_ok.extend_from_slice(&0u16.to_le_bytes());
        send_packet(stream, 1, &prepare_ok);
        send_packet(stream, 2, &field_payload("?", 0xFD, 0));
        send_packet(stream, 3, &eof_payload(0x0002));

        drain(stream);
    });

    let conn = Conn::new(test_opts(port));
    conn.connect().unwrap();

    let mut stmt = conn.prepare("INSERT INTO t VALUES (?)").unwrap();
    stmt.bind_params(&[Value::Int(1)]).unwrap();
    assert!(matches!(
        stmt.send_long_data(0, b"body").unwrap_err(),
        Error::UnsupportedParamType(0)
    ));

    conn.close().unwrap();
    server.join().unwrap();
}

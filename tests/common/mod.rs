//! Scripted MySQL server double shared by the protocol test suites.
#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use mywire::scramble::scramble_41;
use mywire::Opts;

pub const SEED: &[u8; 20] = b"abcdefghijklmnopqrst";
pub const PASSWORD: &str = "hunter2";

/// Server capability word: long-password, long-flag, connect-with-db,
/// protocol-41, transactions, secure-conn.
pub const SERVER_CAPS: u16 = 0x0001 | 0x0004 | 0x0008 | 0x0200 | 0x2000 | 0x8000;

pub fn send_packet(stream: &mut TcpStream, seq: u8, payload: &[u8]) {
    let len = (payload.len() as u32).to_le_bytes();
    stream.write_all(&[len[0], len[1], len[2], seq]).unwrap();
    stream.write_all(payload).unwrap();
}

pub fn recv_packet(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).unwrap();
    let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).unwrap();
    (header[3], payload)
}

/// Read until the peer hangs up, swallowing the trailing COM_QUIT.
pub fn drain(stream: &mut TcpStream) {
    let mut buf = [0u8; 256];
    while let Ok(n) = stream.read(&mut buf) {
        if n == 0 {
            break;
        }
    }
}

pub fn lenc(out: &mut Vec<u8>, bytes: &[u8]) {
    assert!(bytes.len() < 251);
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
}

pub fn init_payload() -> Vec<u8> {
    init_payload_with_caps(SERVER_CAPS)
}

pub fn init_payload_with_caps(caps: u16) -> Vec<u8> {
    let mut p = vec![10]; // protocol version
    p.extend_from_slice(b"5.1.73-double\0");
    p.extend_from_slice(&99u32.to_le_bytes()); // thread id
    p.extend_from_slice(&SEED[..8]);
    p.push(0);
    p.extend_from_slice(&caps.to_le_bytes());
    p.push(33); // charset
    p.extend_from_slice(&0x0002u16.to_le_bytes()); // status: autocommit
    p.extend_from_slice(&0u16.to_le_bytes()); // capability high word
    p.push(21); // scramble length
    p.extend_from_slice(&[0u8; 10]);
    if caps & 0x0200 != 0 {
        p.extend_from_slice(&SEED[8..]);
        p.push(0);
    }
    p
}

pub fn ok_payload(affected: u8, insert_id: u8, status: u16, warnings: u16) -> Vec<u8> {
    let mut p = vec![0x00, affected, insert_id];
    p.extend_from_slice(&status.to_le_bytes());
    p.extend_from_slice(&warnings.to_le_bytes());
    p
}

/// OK packet as pre-4.1 servers send it: no warning word.
pub fn ok_payload_40(affected: u8, insert_id: u8, status: u16) -> Vec<u8> {
    let mut p = vec![0x00, affected, insert_id];
    p.extend_from_slice(&status.to_le_bytes());
    p
}

pub fn eof_payload(status: u16) -> Vec<u8> {
    let mut p = vec![0xFE, 0, 0];
    p.extend_from_slice(&status.to_le_bytes());
    p
}

pub fn err_payload(code: u16, sqlstate: &str, message: &str) -> Vec<u8> {
    let mut p = vec![0xFF];
    p.extend_from_slice(&code.to_le_bytes());
    p.push(b'#');
    p.extend_from_slice(sqlstate.as_bytes());
    p.extend_from_slice(message.as_bytes());
    p
}

pub fn field_payload(name: &str, column_type: u8, flags: u16) -> Vec<u8> {
    field_payload_charset(name, column_type, flags, 33)
}

pub fn field_payload_charset(name: &str, column_type: u8, flags: u16, charset: u16) -> Vec<u8> {
    let mut p = Vec::new();
    lenc(&mut p, b"def");
    lenc(&mut p, b"");
    lenc(&mut p, b"");
    lenc(&mut p, b"");
    lenc(&mut p, name.as_bytes());
    lenc(&mut p, name.as_bytes());
    p.push(0x0C);
    p.extend_from_slice(&charset.to_le_bytes());
    p.extend_from_slice(&11u32.to_le_bytes()); // length
    p.push(column_type);
    p.extend_from_slice(&flags.to_le_bytes());
    p.push(0); // decimals
    p.extend_from_slice(&[0, 0]);
    p
}

pub fn text_row(cells: &[&[u8]]) -> Vec<u8> {
    let mut p = Vec::new();
    for cell in cells {
        lenc(&mut p, cell);
    }
    p
}

/// Serve the 4.1 handshake and verify the client's auth packet.
pub fn serve_handshake(stream: &mut TcpStream) {
    send_packet(stream, 0, &init_payload());

    let (seq, auth) = recv_packet(stream);
    assert_eq!(seq, 1);

    let flags = u32::from_le_bytes(auth[0..4].try_into().unwrap());
    assert_eq!(flags & 0x0200, 0x0200, "protocol 41 requested");
    assert_eq!(flags & 0x8000, 0x8000, "secure-conn requested");
    assert_eq!(flags & 0x0003_0000, 0x0003_0000, "multi statements+results");
    assert_eq!(flags & 0x0008, 0, "no connect-with-db without a db");
    assert_eq!(auth[8], 33, "server charset echoed");
    assert!(auth[9..32].iter().all(|&b| b == 0));

    let user_end = 32 + auth[32..].iter().position(|&b| b == 0).unwrap();
    assert_eq!(&auth[32..user_end], b"app");

    let token_len = auth[user_end + 1] as usize;
    assert_eq!(token_len, 20);
    let token = &auth[user_end + 2..user_end + 2 + token_len];
    assert_eq!(token, scramble_41(SEED, PASSWORD).as_slice());

    send_packet(stream, 2, &ok_payload(0, 0, 0x0002, 0));
}

pub fn serve_ping(stream: &mut TcpStream) {
    let (seq, cmd) = recv_packet(stream);
    assert_eq!(seq, 0);
    assert_eq!(cmd, [0x0E]);
    send_packet(stream, 1, &ok_payload(0, 0, 0x0002, 0));
}

pub fn spawn_server(
    script: impl FnOnce(&mut TcpStream) + Send + 'static,
) -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        script(&mut stream);
    });
    (port, handle)
}

pub fn test_opts(port: u16) -> Opts {
    Opts {
        host: Some("127.0.0.1".to_string()),
        port,
        user: "app".to_string(),
        password: Some(PASSWORD.to_string()),
        ..Opts::default()
    }
}

//! End-to-end scenarios over a real TCP connection, covering the reload and
//! oversize-request cases.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use daemon::index::IndexSlot;
use daemon::server::{self, Dispatcher};
use test_support::write_trie_blob;

async fn send_query(stream: &mut TcpStream, query: &str, max_number: u32) -> Vec<String> {
    let request = protocol::GetRequest {
        max_number,
        query: query.to_owned(),
    };
    let body = request.encode();
    let mut frame = vec![protocol::REQUEST_MAGIC, 0x00, 0, 0, 0, 0, 0, 0];
    frame[2..6].copy_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    stream.write_all(&frame).await.unwrap();

    let mut header = [0u8; 8];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(header[0], protocol::RESPONSE_MAGIC);
    let bodylen = u32::from_be_bytes([header[3], header[4], header[5], header[6]]) as usize;
    let mut body = vec![0u8; bodylen];
    stream.read_exact(&mut body).await.unwrap();
    protocol::QueryResponse::decode(&body).unwrap().names
}

#[tokio::test]
async fn reload_while_serving_switches_results_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let dict_path = dir.path().join("dict.txt");
    std::fs::write(&dict_path, "").unwrap();
    let index_a = write_trie_blob(dir.path(), "a.bin", &[("al", "alpha", 0.1)]);
    let index_b = write_trie_blob(dir.path(), "b.bin", &[("be", "beta", 0.1)]);

    let slot = Arc::new(IndexSlot::load(&dict_path, &index_a).unwrap());
    let dispatcher = Arc::new(Dispatcher::spawn(2, Arc::clone(&slot), 20, 1024));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::accept_loop(listener, dispatcher));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let before = send_query(&mut stream, "al", 10).await;
    assert_eq!(before, vec!["alpha".to_owned()]);

    slot.reload(&index_b).await.unwrap();

    let after_old = send_query(&mut stream, "al", 10).await;
    assert!(after_old.is_empty());
    let after_new = send_query(&mut stream, "be", 10).await;
    assert_eq!(after_new, vec!["beta".to_owned()]);
}

#[tokio::test]
async fn oversize_request_body_is_served_and_connection_keeps_serving() {
    let dir = tempfile::tempdir().unwrap();
    let dict_path = dir.path().join("dict.txt");
    std::fs::write(&dict_path, "").unwrap();
    let index_path = write_trie_blob(dir.path(), "index.bin", &[("pad", "padded", 0.1)]);

    let slot = Arc::new(IndexSlot::load(&dict_path, &index_path).unwrap());
    let dispatcher = Arc::new(Dispatcher::spawn(1, Arc::clone(&slot), 20, 1024));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::accept_loop(listener, dispatcher));

    let mut stream = TcpStream::connect(addr).await.unwrap();

    // A 200 KB query body: far past the connection's 2048-byte initial
    // buffer, forcing several doublings before the body can be read.
    let oversized_query = format!("pad{}", "x".repeat(200 * 1024));
    let result = send_query(&mut stream, &oversized_query, 10).await;
    assert!(result.is_empty(), "oversized nonsense query should simply miss, not error");

    // A normal small request on the same connection afterwards proves the
    // connection survived the oversize request; it does not by itself prove
    // the buffer shrank back down (see
    // `shrinks_back_down_on_the_next_new_cmd_entry` for that).
    let normal = send_query(&mut stream, "pad", 10).await;
    assert_eq!(normal, vec!["padded".to_owned()]);
}

#[test]
fn shrinks_back_down_on_the_next_new_cmd_entry() {
    // Scenario 6: a 200 KB body grows `rbuf` well past the high watermark;
    // the next `new_cmd` entry on the same connection shrinks it back to
    // the initial size rather than keeping the oversized allocation.
    use daemon::connection::{grow_for_body, shrink_if_oversized, INITIAL_READ_SIZE, READ_BUFFER_HIGHWAT};

    let mut buf = Vec::new();
    grow_for_body(&mut buf, 200 * 1024);
    assert!(buf.capacity() > READ_BUFFER_HIGHWAT);

    shrink_if_oversized(&mut buf);
    assert!(buf.capacity() <= READ_BUFFER_HIGHWAT);
    assert!(buf.capacity() >= INITIAL_READ_SIZE);
}

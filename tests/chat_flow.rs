//! End-to-end chat flows over in-memory duplex streams and real TCP.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use room_chat_server::{
    handle_connection, AppError, ChatServer, Registry, RoomId, ServerConfig,
};

const LISTING_FOOTER: &str = "========================";

struct TestClient {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
    handle: JoinHandle<Result<(), AppError>>,
}

impl TestClient {
    /// Connect and consume the greeting
    async fn connect(registry: &Arc<Registry>, config: &Arc<ServerConfig>) -> Self {
        let (client, server) = tokio::io::duplex(8192);
        let handle = tokio::spawn(handle_connection(
            server,
            registry.clone(),
            config.clone(),
        ));
        let (read_half, writer) = tokio::io::split(client);
        let mut client = Self {
            lines: BufReader::new(read_half).lines(),
            writer,
            handle,
        };
        client.read_until(LISTING_FOOTER).await;
        client
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .unwrap();
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }

    async fn next(&mut self) -> String {
        timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("timed out waiting for line")
            .unwrap()
            .expect("connection closed")
    }

    async fn expect(&mut self, line: &str) {
        assert_eq!(self.next().await, line);
    }

    /// Lines up to and including `last`
    async fn read_until(&mut self, last: &str) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.next().await;
            let done = line == last;
            lines.push(line);
            if done {
                return lines;
            }
        }
    }

    async fn list(&mut self) -> HashSet<String> {
        self.send("/list").await;
        let lines = self.read_until(LISTING_FOOTER).await;
        assert_eq!(lines[0], "=== Available Rooms ===");
        lines[1..lines.len() - 1].iter().cloned().collect()
    }

    async fn close(self) {
        drop(self.writer);
        drop(self.lines);
        let result = timeout(Duration::from_secs(2), self.handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}

async fn setup() -> (Arc<Registry>, Arc<ServerConfig>) {
    let config = Arc::new(ServerConfig::default());
    let registry = Registry::start(&config).await.unwrap();
    (registry, config)
}

#[tokio::test]
async fn create_join_chat_leave_scenario() {
    let (registry, config) = setup().await;
    let mut a = TestClient::connect(&registry, &config).await;
    let mut b = TestClient::connect(&registry, &config).await;

    a.send("/create My Room").await;
    a.expect("*** Created room: My Room ***").await;
    a.expect("*** Joined room: My Room ***").await;

    b.send("/join my_room").await;
    b.expect("*** Joined room: My Room ***").await;
    a.expect("*** User2 joined My Room ***").await;

    // no echo to the sender, and B never saw its own join notice
    a.send("hello").await;
    b.expect("User1: hello").await;
    b.send("hey").await;
    a.expect("User2: hey").await;

    a.send("/leave").await;
    a.expect("*** Left room: My Room ***").await;
    b.expect("*** User1 left My Room ***").await;

    a.send("anyone?").await;
    a.expect("Please join a room first. Use /list to see available rooms.")
        .await;

    a.close().await;
    b.close().await;
}

#[tokio::test]
async fn blank_lines_get_no_reply() {
    let (registry, config) = setup().await;
    let mut a = TestClient::connect(&registry, &config).await;

    a.send("   ").await;
    a.send("").await;
    a.send("/leave").await;

    a.expect("You are not in any room").await;
    a.close().await;
}

#[tokio::test]
async fn disconnect_notifies_room() {
    let (registry, config) = setup().await;
    let mut a = TestClient::connect(&registry, &config).await;
    let mut b = TestClient::connect(&registry, &config).await;

    a.send("/join general").await;
    a.expect("*** Joined room: General Chat ***").await;
    b.send("/join general").await;
    b.expect("*** Joined room: General Chat ***").await;
    a.expect("*** User2 joined General Chat ***").await;

    b.close().await;

    a.expect("*** User2 left General Chat ***").await;
    let general = registry
        .lookup_room(&RoomId::normalize("general"))
        .await
        .unwrap();
    assert_eq!(general.member_count().await, 1);
    a.close().await;
    assert_eq!(general.member_count().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_create_has_one_winner() {
    let (registry, config) = setup().await;
    let mut a = TestClient::connect(&registry, &config).await;
    let mut b = TestClient::connect(&registry, &config).await;

    tokio::join!(a.send("/create Lounge"), b.send("/create lounge"));
    let (first_a, first_b) = tokio::join!(a.next(), b.next());

    let outcomes = [first_a, first_b];
    let created = outcomes
        .iter()
        .filter(|line| line.starts_with("*** Created room: "))
        .count();
    let conflicts = outcomes
        .iter()
        .filter(|line| *line == "Room 'lounge' already exists")
        .count();
    assert_eq!((created, conflicts), (1, 1));
    assert_eq!(registry.room_count().await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rename_has_one_winner() {
    let (registry, config) = setup().await;
    let mut a = TestClient::connect(&registry, &config).await;
    let mut b = TestClient::connect(&registry, &config).await;

    tokio::join!(a.send("/username Zed"), b.send("/username Zed"));
    let (reply_a, reply_b) = tokio::join!(a.next(), b.next());

    let replies = [reply_a, reply_b];
    let won = replies
        .iter()
        .filter(|line| line.starts_with("*** Username changed from "))
        .count();
    let rejected = replies
        .iter()
        .filter(|line| *line == "Username 'Zed' is already taken")
        .count();
    assert_eq!((won, rejected), (1, 1));
}

#[tokio::test]
async fn rename_is_announced_in_order_with_chat() {
    let (registry, config) = setup().await;
    let mut a = TestClient::connect(&registry, &config).await;
    let mut b = TestClient::connect(&registry, &config).await;

    a.send("/join general").await;
    a.expect("*** Joined room: General Chat ***").await;
    b.send("/join general").await;
    b.expect("*** Joined room: General Chat ***").await;
    a.expect("*** User2 joined General Chat ***").await;

    b.send("/username Bea").await;
    b.send("first as Bea").await;
    b.expect("*** Username changed from 'User2' to 'Bea' ***")
        .await;

    a.expect("*** User2 is now known as Bea ***").await;
    a.expect("Bea: first as Bea").await;
}

#[tokio::test]
async fn list_is_stable_without_changes() {
    let (registry, config) = setup().await;
    let mut a = TestClient::connect(&registry, &config).await;

    a.send("/create Den").await;
    a.expect("*** Created room: Den ***").await;
    a.expect("*** Joined room: Den ***").await;

    let first = a.list().await;
    let second = a.list().await;

    assert_eq!(first, second);
    let expected: HashSet<String> = [" den:Den (1 users)", " general:General Chat (0 users)"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(first, expected);
}

#[tokio::test]
async fn invalid_utf8_is_replaced_not_fatal() {
    let (registry, config) = setup().await;
    let mut a = TestClient::connect(&registry, &config).await;
    let mut b = TestClient::connect(&registry, &config).await;

    a.send("/join general").await;
    a.expect("*** Joined room: General Chat ***").await;
    b.send("/join general").await;
    b.expect("*** Joined room: General Chat ***").await;
    a.expect("*** User2 joined General Chat ***").await;

    b.send_raw(b"\xff\xfe hi\r\n").await;
    a.expect("User2: \u{FFFD}\u{FFFD} hi").await;

    // Still connected and routed
    b.send("/leave").await;
    b.expect("*** Left room: General Chat ***").await;
    a.expect("*** User2 left General Chat ***").await;

    b.close().await;
    a.close().await;
}

#[tokio::test]
async fn join_unknown_room_reports_not_found() {
    let (registry, config) = setup().await;
    let mut a = TestClient::connect(&registry, &config).await;

    a.send("/join Nowhere Land").await;
    a.expect("Room 'nowhere_land' does not exist. Use /list to see available rooms")
        .await;
}

#[tokio::test]
async fn serves_over_tcp() {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        server_name: "TestChat".to_string(),
        ..ServerConfig::default()
    };
    let server = ChatServer::new(config).await.unwrap();
    assert_eq!(server.config().server_name, "TestChat");
    let registry = server.registry().clone();
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.run(listener));

    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let banner = timeout(Duration::from_secs(2), lines.next_line())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(banner.as_deref(), Some("=== Welcome to TestChat ==="));

    writer.write_all(b"/join general\n").await.unwrap();
    loop {
        let line = timeout(Duration::from_secs(2), lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if line == "*** Joined room: General Chat ***" {
            break;
        }
    }

    let general = registry
        .lookup_room(&RoomId::normalize("general"))
        .await
        .unwrap();
    assert_eq!(general.member_count().await, 1);
    assert_eq!(registry.room_count().await, 1);
}

#![allow(dead_code)]

use ftpgate::{
    ServerBuilder,
    auth::{BackendBinding, BackendKind},
    controlplane::{BackendConfig, InMemoryControlPlane, Permission, SecretValue, UserRecord},
    path::VirtualPath,
};
use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU16, Ordering},
    },
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::oneshot,
};

static TESTPORT: AtomicU16 = AtomicU16::new(21300);
static PASSIVE_BLOCK: AtomicU16 = AtomicU16::new(0);

// Every harness gets its own block of passive ports so tests running in parallel do not compete.
pub const PASSIVE_PORTS_PER_HARNESS: u16 = 10;
const PASSIVE_BASE: u16 = 41000;

pub struct Harness {
    pub addr: String,
    pub root: PathBuf,
    pub passive_ports: std::ops::RangeInclusive<u16>,
    pub control_plane: Arc<InMemoryControlPlane>,
    _tempdir: tempfile::TempDir,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Harness {
    // Starts the server's shutdown. Sessions get the grace period configured on the builder.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn user(username: &str, password: Option<&str>, home: &str, permissions: Vec<Permission>, backend: BackendBinding) -> UserRecord {
    UserRecord {
        username: username.to_string(),
        disabled: false,
        home: VirtualPath::new(home),
        chroot: true,
        permissions,
        credential: password.map(|p| SecretValue::Inline(p.to_string())),
        backend,
    }
}

pub async fn harness() -> Harness {
    custom_harness(|builder| builder).await
}

// Starts a server on a fresh port with these users:
//
// - `alice` / `wonderland`: every permission, home `/home/alice`
// - `anonymous` / anything: read and list, home `/pub` which holds `readme.txt`
// - `bob` / `builder`: every permission on an object store nobody listens on
pub async fn custom_harness<F>(configure: F) -> Harness
where
    F: FnOnce(ServerBuilder) -> ServerBuilder,
{
    let port = TESTPORT.fetch_add(1, Ordering::Relaxed);
    let block = PASSIVE_BLOCK.fetch_add(1, Ordering::Relaxed);
    let low = PASSIVE_BASE + block * PASSIVE_PORTS_PER_HARNESS;
    let passive_ports = low..=low + PASSIVE_PORTS_PER_HARNESS - 1;
    let addr = format!("127.0.0.1:{}", port);

    let tempdir = tempfile::TempDir::new().unwrap();
    let root = tempdir.path().to_path_buf();
    std::fs::create_dir_all(root.join("home/alice")).unwrap();
    std::fs::create_dir_all(root.join("pub")).unwrap();
    std::fs::write(root.join("pub/readme.txt"), b"read me\n").unwrap();

    let cp = Arc::new(InMemoryControlPlane::new());
    cp.upsert_backend(
        "local",
        None,
        BackendConfig::Filesystem {
            root: root.to_string_lossy().to_string(),
        },
    )
    .await;
    cp.upsert_backend(
        "bucket",
        None,
        BackendConfig::ObjectStore {
            endpoint: "http://127.0.0.1:1".into(),
            region: Some("us-east-1".into()),
            bucket: "data".into(),
            root: None,
            access_key_id: "AKIA".into(),
            secret_access_key: SecretValue::Inline("secret".into()),
        },
    )
    .await;
    let local = BackendBinding::new(BackendKind::Filesystem, "local");
    let all = vec![Permission::Read, Permission::Write, Permission::Delete, Permission::List];
    cp.upsert_user(user("alice", Some("wonderland"), "/home/alice", all.clone(), local.clone())).await;
    cp.upsert_user(user("anonymous", None, "/pub", vec![Permission::Read, Permission::List], local)).await;
    cp.upsert_user(user("bob", Some("builder"), "/", all, BackendBinding::new(BackendKind::ObjectStore, "bucket"))).await;

    let builder = ServerBuilder::new(cp.clone())
        .bind_address(addr.parse().unwrap())
        .greeting("Welcome test")
        .passive_ports(passive_ports.clone())
        .failed_login_delay(Duration::from_millis(10))
        .logger(None);
    let server = configure(builder).build().unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(server.listen(async move {
        let _ = shutdown_rx.await;
    }));
    while TcpStream::connect(&addr).await.is_err() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    Harness {
        addr,
        root,
        passive_ports,
        control_plane: cp,
        _tempdir: tempdir,
        shutdown: Some(shutdown_tx),
    }
}

// A raw control connection, one reply line at a time.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    pub async fn connect(addr: &str) -> Client {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, write) = stream.into_split();
        let mut client = Client {
            reader: BufReader::new(read),
            writer: write,
        };
        assert_eq!(client.line().await, "220 Welcome test");
        client
    }

    pub async fn login(addr: &str, username: &str, password: &str) -> Client {
        let mut client = Client::connect(addr).await;
        assert!(client.cmd(&format!("USER {}", username)).await.starts_with("331"));
        assert!(client.cmd(&format!("PASS {}", password)).await.starts_with("230"));
        client
    }

    // Writes bytes as they are, in a single write.
    pub async fn write_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }

    pub async fn send(&mut self, line: &str) {
        self.writer.write_all(format!("{}\r\n", line).as_bytes()).await.unwrap();
    }

    // Reads one reply line without its line ending. Empty when the server closed the connection.
    pub async fn line(&mut self) -> String {
        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(10), self.reader.read_line(&mut line)).await.unwrap().unwrap();
        line.trim_end().to_string()
    }

    // Sends a command and returns the last line of its reply.
    pub async fn cmd(&mut self, line: &str) -> String {
        self.send(line).await;
        self.reply().await
    }

    // Reads a complete, possibly multi-line, reply and returns its last line.
    pub async fn reply(&mut self) -> String {
        let first = self.line().await;
        if first.len() > 3 && first.as_bytes()[3] == b'-' {
            let end = format!("{} ", &first[..3]);
            loop {
                let line = self.line().await;
                if line.is_empty() || line.starts_with(&end) {
                    return line;
                }
            }
        }
        first
    }

    pub async fn pasv(&mut self) -> u16 {
        let reply = self.cmd("PASV").await;
        assert!(reply.starts_with("227"), "{}", reply);
        parse_pasv_port(&reply)
    }
}

// Waits until nothing listens on the passive port any more, so it can be bound again.
pub async fn port_is_released(port: u16) -> bool {
    for _ in 0..100 {
        if std::net::TcpListener::bind(("127.0.0.1", port)).is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

pub fn parse_pasv_port(reply: &str) -> u16 {
    let body = reply.split_once('(').and_then(|(_, rest)| rest.split_once(')')).unwrap().0;
    let nums: Vec<u16> = body.split(',').map(|s| s.trim().parse().unwrap()).collect();
    nums[4] * 256 + nums[5]
}

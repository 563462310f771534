#![allow(missing_docs)]

pub mod common;

use async_ftp::{FtpStream, types::FileType};
use common::{Client, Harness, harness};
use ftpgate::controlplane::ControlPlane;
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use std::io::Cursor;

#[fixture]
async fn server() -> Harness {
    harness().await
}

#[rstest]
#[awt]
#[tokio::test]
async fn greets_and_says_bye(#[future] server: Harness) {
    let mut client = Client::connect(&server.addr).await;
    assert_eq!(client.cmd("QUIT").await, "221 Bye!");
    assert_eq!(client.line().await, "");
}

#[rstest]
#[case("PWD")]
#[case("CWD /")]
#[case("LIST")]
#[case("NLST")]
#[case("RETR readme.txt")]
#[case("STOR x.txt")]
#[case("DELE x.txt")]
#[case("MKD x")]
#[case("RNFR x")]
#[case("PASV")]
#[case("SIZE readme.txt")]
#[awt]
#[tokio::test]
async fn data_and_navigation_need_a_login(#[future] server: Harness, #[case] command: &str) {
    let mut client = Client::connect(&server.addr).await;
    assert_eq!(client.cmd(command).await, "530 Please authenticate");
    // Still usable afterwards.
    assert!(client.cmd("NOOP").await.starts_with("200"));
}

#[rstest]
#[awt]
#[tokio::test]
async fn wrong_password_and_unknown_user_look_alike(#[future] server: Harness) {
    let mut client = Client::connect(&server.addr).await;
    client.cmd("USER alice").await;
    let wrong_password = client.cmd("PASS nope").await;
    client.cmd("USER mallory").await;
    let unknown_user = client.cmd("PASS wonderland").await;
    assert_eq!(wrong_password, "530 Authentication failed");
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(client.cmd("PWD").await, "530 Please authenticate");
}

#[rstest]
#[awt]
#[tokio::test]
async fn pass_without_user_is_out_of_sequence(#[future] server: Harness) {
    let mut client = Client::connect(&server.addr).await;
    assert_eq!(client.cmd("PASS secret").await, "503 Please supply a username first");
}

#[rstest]
#[awt]
#[tokio::test]
async fn login_lands_in_home(#[future] server: Harness) {
    let mut ftp = FtpStream::connect(&server.addr).await.unwrap();
    ftp.login("alice", "wonderland").await.unwrap();
    assert_eq!(ftp.pwd().await.unwrap(), "/home/alice");
}

#[rstest]
#[awt]
#[tokio::test]
async fn cdup_from_home_is_clamped(#[future] server: Harness) {
    let mut client = Client::login(&server.addr, "alice", "wonderland").await;
    assert!(client.cmd("CWD ..").await.starts_with("250"));
    assert_eq!(client.cmd("PWD").await, "257 \"/home/alice\"");
    assert!(client.cmd("CDUP").await.starts_with("250"));
    assert!(client.cmd("CWD ../../..").await.starts_with("250"));
    assert_eq!(client.cmd("PWD").await, "257 \"/home/alice\"");
}

#[rstest]
#[case("CWD /pub")]
#[case("CWD /home/alice/../../pub")]
#[case("SIZE /pub/readme.txt")]
#[case("RETR /pub/readme.txt")]
#[case("DELE /pub/readme.txt")]
#[case("MKD /tmp")]
#[awt]
#[tokio::test]
async fn absolute_paths_outside_home_are_denied(#[future] server: Harness, #[case] command: &str) {
    let mut client = Client::login(&server.addr, "alice", "wonderland").await;
    assert_eq!(client.cmd(command).await, "550 Permission denied");
    assert!(server.root.join("pub/readme.txt").exists());
    assert!(!server.root.join("tmp").exists());
}

#[rstest]
#[case("STOR upload.txt")]
#[case("APPE readme.txt")]
#[case("DELE readme.txt")]
#[case("RNFR readme.txt")]
#[case("MKD incoming")]
#[case("RMD incoming")]
#[awt]
#[tokio::test]
async fn anonymous_cannot_change_anything(#[future] server: Harness, #[case] command: &str) {
    let mut client = Client::login(&server.addr, "anonymous", "guest@example.com").await;
    assert_eq!(client.cmd(command).await, "550 Permission denied");
    assert_eq!(std::fs::read(server.root.join("pub/readme.txt")).unwrap(), b"read me\n");
    assert!(!server.root.join("pub/incoming").exists());
}

#[rstest]
#[awt]
#[tokio::test]
async fn anonymous_can_read_and_list(#[future] server: Harness) {
    let mut ftp = FtpStream::connect(&server.addr).await.unwrap();
    ftp.login("anonymous", "guest@example.com").await.unwrap();
    assert_eq!(ftp.nlst(None).await.unwrap(), vec!["readme.txt".to_string()]);
    let content = ftp.simple_retr("readme.txt").await.unwrap();
    assert_eq!(content.into_inner(), b"read me\n");
}

#[rstest]
#[awt]
#[tokio::test]
async fn store_then_retrieve_round_trips(#[future] server: Harness) {
    let mut ftp = FtpStream::connect(&server.addr).await.unwrap();
    ftp.login("alice", "wonderland").await.unwrap();
    ftp.transfer_type(FileType::Binary).await.unwrap();

    let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    ftp.put("data.bin", &mut Cursor::new(payload.clone())).await.unwrap();
    assert_eq!(std::fs::read(server.root.join("home/alice/data.bin")).unwrap(), payload);
    assert_eq!(ftp.size("data.bin").await.unwrap(), Some(payload.len()));

    let fetched = ftp.simple_retr("data.bin").await.unwrap();
    assert_eq!(fetched.into_inner(), payload);
}

#[rstest]
#[awt]
#[tokio::test]
async fn append_extends_the_file(#[future] server: Harness) {
    let mut ftp = FtpStream::connect(&server.addr).await.unwrap();
    ftp.login("alice", "wonderland").await.unwrap();
    ftp.put("log.txt", &mut Cursor::new(b"one\n".to_vec())).await.unwrap();
    ftp.append("log.txt", &mut Cursor::new(b"two\n".to_vec())).await.unwrap();
    assert_eq!(std::fs::read(server.root.join("home/alice/log.txt")).unwrap(), b"one\ntwo\n");
}

#[rstest]
#[awt]
#[tokio::test]
async fn directories_and_renames(#[future] server: Harness) {
    let mut ftp = FtpStream::connect(&server.addr).await.unwrap();
    ftp.login("alice", "wonderland").await.unwrap();
    ftp.mkdir("docs").await.unwrap();
    ftp.cwd("docs").await.unwrap();
    assert_eq!(ftp.pwd().await.unwrap(), "/home/alice/docs");
    ftp.put("a.txt", &mut Cursor::new(b"a".to_vec())).await.unwrap();
    ftp.rename("a.txt", "b.txt").await.unwrap();
    assert!(server.root.join("home/alice/docs/b.txt").exists());
    assert!(!server.root.join("home/alice/docs/a.txt").exists());

    ftp.rm("b.txt").await.unwrap();
    ftp.cdup().await.unwrap();
    ftp.rmdir("docs").await.unwrap();
    assert!(!server.root.join("home/alice/docs").exists());
}

#[rstest]
#[awt]
#[tokio::test]
async fn missing_files_are_550(#[future] server: Harness) {
    let mut client = Client::login(&server.addr, "alice", "wonderland").await;
    assert!(client.cmd("SIZE nothing.txt").await.starts_with("550"));
    assert!(client.cmd("DELE nothing.txt").await.starts_with("550"));
    assert!(client.cmd("CWD nowhere").await.starts_with("550"));
    assert!(client.cmd("RNFR nothing.txt").await.starts_with("550"));
}

#[rstest]
#[awt]
#[tokio::test]
async fn rnto_without_rnfr_is_out_of_sequence(#[future] server: Harness) {
    let mut client = Client::login(&server.addr, "alice", "wonderland").await;
    assert!(client.cmd("RNTO b.txt").await.starts_with("503"));
}

#[rstest]
#[awt]
#[tokio::test]
async fn transfer_without_pasv_is_425(#[future] server: Harness) {
    let mut client = Client::login(&server.addr, "anonymous", "x").await;
    assert!(client.cmd("RETR readme.txt").await.starts_with("425"));
    assert!(client.cmd("NOOP").await.starts_with("200"));
}

#[rstest]
#[awt]
#[tokio::test]
async fn append_over_raw_data_connection(#[future] server: Harness) {
    use tokio::io::AsyncWriteExt;

    let mut client = Client::login(&server.addr, "alice", "wonderland").await;
    for chunk in ["one\n", "two\n"] {
        let port = client.pasv().await;
        let mut data = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        client.send("APPE log.txt").await;
        assert!(client.line().await.starts_with("150"));
        data.write_all(chunk.as_bytes()).await.unwrap();
        data.shutdown().await.unwrap();
        drop(data);
        assert!(client.line().await.starts_with("226"));
    }
    assert_eq!(std::fs::read(server.root.join("home/alice/log.txt")).unwrap(), b"one\ntwo\n");
}

#[rstest]
#[awt]
#[tokio::test]
async fn list_shows_entries(#[future] server: Harness) {
    use tokio::io::AsyncReadExt;

    let mut client = Client::login(&server.addr, "anonymous", "x").await;
    let port = client.pasv().await;
    let mut data = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    client.send("LIST").await;
    assert!(client.line().await.starts_with("150"));
    let mut listing = String::new();
    data.read_to_string(&mut listing).await.unwrap();
    assert!(client.line().await.starts_with("226"));

    let line = listing.lines().find(|l| l.ends_with("readme.txt")).expect("readme.txt is listed");
    assert!(line.starts_with('-'), "{}", line);
    assert!(line.contains(" 8 "), "{}", line);
}

#[rstest]
#[awt]
#[tokio::test]
async fn informational_commands(#[future] server: Harness) {
    let mut client = Client::connect(&server.addr).await;
    assert_eq!(client.cmd("SYST").await, "215 UNIX Type: L8");
    assert_eq!(client.cmd("FEAT").await, "211 END");
    assert!(client.cmd("HELP").await.starts_with("214"));

    let mut client = Client::login(&server.addr, "alice", "wonderland").await;
    assert!(client.cmd("TYPE I").await.starts_with("200"));
    assert!(client.cmd("TYPE A").await.starts_with("200"));
    assert!(client.cmd("TYPE E").await.starts_with("504"));
    assert!(client.cmd("STRU F").await.starts_with("200"));
    assert!(client.cmd("MODE S").await.starts_with("200"));
    assert!(client.cmd("OPTS UTF8 ON").await.starts_with("200"));
    assert_eq!(client.cmd("PORT 127,0,0,1,4,1").await, "502 Active mode is not supported, use PASV");
}

#[rstest]
#[awt]
#[tokio::test]
async fn unknown_commands_are_500(#[future] server: Harness) {
    let mut client = Client::connect(&server.addr).await;
    assert_eq!(client.cmd("XYZZY").await, "500 Command not implemented");
    assert_eq!(client.cmd("QUIT").await, "221 Bye!");
}

#[tokio::test]
async fn too_many_violations_close_the_session() {
    let server = common::custom_harness(|builder| builder.violation_threshold(2)).await;
    let mut client = Client::connect(&server.addr).await;
    assert!(client.cmd("XYZZY").await.starts_with("500"));
    assert!(client.cmd("PASS early").await.starts_with("503"));
    assert!(client.cmd("XYZZY").await.starts_with("500"));
    assert!(client.line().await.starts_with("421"));
    assert_eq!(client.line().await, "");
}

#[tokio::test]
async fn idle_sessions_are_closed() {
    let server = common::custom_harness(|builder| builder.idle_session_timeout(1)).await;
    let mut client = Client::connect(&server.addr).await;
    assert!(client.line().await.starts_with("421"));
    assert_eq!(client.line().await, "");
}

#[rstest]
#[awt]
#[tokio::test]
async fn passive_ports_run_out_and_come_back(#[future] server: Harness) {
    let mut clients = Vec::new();
    for _ in 0..common::PASSIVE_PORTS_PER_HARNESS {
        let mut client = Client::login(&server.addr, "alice", "wonderland").await;
        let port = client.pasv().await;
        assert!(server.passive_ports.contains(&port));
        clients.push(client);
    }

    let mut late = Client::login(&server.addr, "alice", "wonderland").await;
    assert!(late.cmd("PASV").await.starts_with("425"));

    let mut quitter = clients.remove(0);
    assert_eq!(quitter.cmd("QUIT").await, "221 Bye!");
    assert_eq!(quitter.line().await, "");

    // The quitting session hands its port back as it winds down.
    let mut reply = late.cmd("PASV").await;
    for _ in 0..50 {
        if reply.starts_with("227") {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        reply = late.cmd("PASV").await;
    }
    assert!(reply.starts_with("227"), "{}", reply);
}

#[rstest]
#[awt]
#[tokio::test]
async fn a_second_pasv_replaces_the_first(#[future] server: Harness) {
    let mut client = Client::login(&server.addr, "alice", "wonderland").await;
    // Far more PASVs than there are ports: each one gives back the previous port.
    for _ in 0..common::PASSIVE_PORTS_PER_HARNESS * 3 {
        client.pasv().await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
}

#[rstest]
#[awt]
#[tokio::test]
async fn unreachable_object_store_is_transient(#[future] server: Harness) {
    let mut client = Client::login(&server.addr, "bob", "builder").await;
    assert!(client.cmd("SIZE foo").await.starts_with("451"));
    assert!(client.cmd("NOOP").await.starts_with("200"));
}

#[rstest]
#[awt]
#[tokio::test]
async fn disabling_a_user_takes_effect_on_next_login(#[future] server: Harness) {
    let mut record = server.control_plane.lookup_user("alice").await.unwrap().unwrap();
    record.disabled = true;
    server.control_plane.upsert_user(record).await;

    let mut client = Client::connect(&server.addr).await;
    client.cmd("USER alice").await;
    assert_eq!(client.cmd("PASS wonderland").await, "530 Authentication failed");
}

#[rstest]
#[awt]
#[tokio::test]
async fn pipelined_login_is_answered_in_order(#[future] server: Harness) {
    let mut client = Client::connect(&server.addr).await;
    client.write_raw(b"USER alice\r\nPASS wonderland\r\nPWD\r\n").await;
    assert!(client.reply().await.starts_with("331"));
    assert!(client.reply().await.starts_with("230"));
    assert_eq!(client.reply().await, "257 \"/home/alice\"");
}

#[rstest]
#[awt]
#[tokio::test]
async fn overlong_line_is_refused_and_the_session_goes_on(#[future] server: Harness) {
    let mut client = Client::connect(&server.addr).await;
    let long = "A".repeat(9000);
    assert_eq!(client.cmd(&long).await, "500 Line too long");
    assert!(client.cmd("NOOP").await.starts_with("200"));
}

#[tokio::test]
async fn overlong_lines_count_as_violations() {
    let server = common::custom_harness(|builder| builder.violation_threshold(1)).await;
    let mut client = Client::connect(&server.addr).await;
    let long = "A".repeat(9000);
    assert_eq!(client.cmd(&long).await, "500 Line too long");
    assert_eq!(client.cmd(&long).await, "500 Line too long");
    assert!(client.line().await.starts_with("421"));
    assert_eq!(client.line().await, "");
}

#[rstest]
#[awt]
#[tokio::test]
async fn rnto_must_follow_rnfr_directly(#[future] server: Harness) {
    std::fs::write(server.root.join("home/alice/a.txt"), b"a").unwrap();
    let mut client = Client::login(&server.addr, "alice", "wonderland").await;
    assert!(client.cmd("RNFR a.txt").await.starts_with("350"));
    assert!(client.cmd("NOOP").await.starts_with("200"));
    assert!(client.cmd("RNTO b.txt").await.starts_with("503"));
    assert!(server.root.join("home/alice/a.txt").exists());
    assert!(!server.root.join("home/alice/b.txt").exists());
}

#[tokio::test]
async fn shutdown_tells_idle_sessions_and_frees_their_ports() {
    let mut server = common::custom_harness(|builder| builder.shutdown_grace_period(1)).await;
    let mut client = Client::login(&server.addr, "alice", "wonderland").await;
    let port = client.pasv().await;

    server.shutdown();
    assert_eq!(client.line().await, "421 Server is shutting down");
    assert_eq!(client.line().await, "");
    assert!(common::port_is_released(port).await, "port {} still taken", port);
}

#[tokio::test]
async fn shutdown_grace_period_ends_stalled_transfers() {
    use tokio::io::AsyncReadExt;

    let mut server = common::custom_harness(|builder| builder.shutdown_grace_period(1)).await;
    let mut client = Client::login(&server.addr, "alice", "wonderland").await;
    let port = client.pasv().await;
    let mut data = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    client.send("STOR stalled.txt").await;
    assert!(client.line().await.starts_with("150"));

    // The client never finishes the upload, so only the grace period ends the session.
    server.shutdown();
    assert_eq!(client.line().await, "");
    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(std::time::Duration::from_secs(10), data.read(&mut buf)).await.unwrap();
    assert!(matches!(read, Ok(0) | Err(_)), "data connection still open");
    assert!(common::port_is_released(port).await, "port {} still taken", port);
}

#[tokio::test]
async fn unused_passive_port_times_out_and_is_reused() {
    let server = common::custom_harness(|builder| builder.passive_accept_timeout(1)).await;
    let mut client = Client::login(&server.addr, "anonymous", "x").await;
    let port = client.pasv().await;
    assert_eq!(port, *server.passive_ports.start());

    // Nobody connects to the data port.
    assert_eq!(client.cmd("RETR readme.txt").await, "425 No data connection established");
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(client.pasv().await, port);
}

#[rstest]
#[awt]
#[tokio::test]
async fn abor_gives_the_passive_port_back(#[future] server: Harness) {
    let mut first = Client::login(&server.addr, "alice", "wonderland").await;
    let port = first.pasv().await;
    assert_eq!(first.cmd("ABOR").await, "226 Closed data channel");
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let mut second = Client::login(&server.addr, "alice", "wonderland").await;
    assert_eq!(second.pasv().await, port);
}

#[rstest]
#[awt]
#[tokio::test]
async fn retr_from_unreachable_object_store_is_transient(#[future] server: Harness) {
    let mut client = Client::login(&server.addr, "bob", "builder").await;
    let port = client.pasv().await;
    let _data = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    assert!(client.cmd("RETR foo").await.starts_with("451"));
    assert!(client.cmd("NOOP").await.starts_with("200"));
}

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::*;

/// Drive `Authenticator::authenticate` against an in-memory duplex pipe
/// while a fake server task answers it, then assert the outcome.
async fn run(authenticator: Authenticator, server: impl FnOnce(tokio::io::DuplexStream) -> tokio::task::JoinHandle<()>) -> Result<Authenticated> {
    let (mut client, server_end) = tokio::io::duplex(4096);
    let server_task = server(server_end);
    let result = authenticator.authenticate(&mut client).await;
    server_task.await.unwrap();
    result
}

#[tokio::test]
async fn external_succeeds_on_first_try() {
    let authenticator = Authenticator::new().with_mechanism(External::new(1000));

    let result = run(authenticator, |mut server| {
        tokio::spawn(async move {
            let mut nul = [0u8; 1];
            server.read_exact(&mut nul).await.unwrap();
            assert_eq!(nul, [0]);

            let line = read_server_line(&mut server).await;
            assert!(line.starts_with("AUTH EXTERNAL "));

            server.write_all(b"OK 0123456789abcdef\r\n").await.unwrap();

            let line = read_server_line(&mut server).await;
            assert_eq!(line, "BEGIN");
        })
    })
    .await
    .unwrap();

    assert_eq!(result.guid().as_str(), "0123456789abcdef");
    assert!(!result.unix_fd());
}

#[tokio::test]
async fn falls_back_to_next_mechanism_on_rejection() {
    let authenticator = Authenticator::new()
        .with_mechanism(External::new(1000))
        .with_mechanism(Anonymous::new("trace"));

    let result = run(authenticator, |mut server| {
        tokio::spawn(async move {
            let mut nul = [0u8; 1];
            server.read_exact(&mut nul).await.unwrap();

            let line = read_server_line(&mut server).await;
            assert!(line.starts_with("AUTH EXTERNAL "));
            server.write_all(b"REJECTED ANONYMOUS\r\n").await.unwrap();

            let line = read_server_line(&mut server).await;
            assert!(line.starts_with("AUTH ANONYMOUS "));
            server.write_all(b"OK deadbeef\r\n").await.unwrap();

            let line = read_server_line(&mut server).await;
            assert_eq!(line, "BEGIN");
        })
    })
    .await
    .unwrap();

    assert_eq!(result.guid().as_str(), "deadbeef");
}

#[tokio::test]
async fn unix_fd_negotiation_is_recorded_on_agreement() {
    let authenticator = Authenticator::new()
        .with_mechanism(External::new(1000))
        .with_unix_fd_negotiation(true);

    let result = run(authenticator, |mut server| {
        tokio::spawn(async move {
            let mut nul = [0u8; 1];
            server.read_exact(&mut nul).await.unwrap();

            let _ = read_server_line(&mut server).await;
            server.write_all(b"OK deadbeef\r\n").await.unwrap();

            let line = read_server_line(&mut server).await;
            assert_eq!(line, "NEGOTIATE_UNIX_FD");
            server.write_all(b"AGREE_UNIX_FD\r\n").await.unwrap();

            let line = read_server_line(&mut server).await;
            assert_eq!(line, "BEGIN");
        })
    })
    .await
    .unwrap();

    assert!(result.unix_fd());
}

#[tokio::test]
async fn all_mechanisms_rejected_fails_with_auth_error() {
    let authenticator = Authenticator::new().with_mechanism(External::new(1000));

    let result = run(authenticator, |mut server| {
        tokio::spawn(async move {
            let mut nul = [0u8; 1];
            server.read_exact(&mut nul).await.unwrap();

            let _ = read_server_line(&mut server).await;
            server.write_all(b"REJECTED\r\n").await.unwrap();
        })
    })
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn malformed_server_line_is_an_error() {
    let authenticator = Authenticator::new().with_mechanism(External::new(1000));

    let result = run(authenticator, |mut server| {
        tokio::spawn(async move {
            let mut nul = [0u8; 1];
            server.read_exact(&mut nul).await.unwrap();

            let _ = read_server_line(&mut server).await;
            server.write_all(b"NONSENSE\r\n").await.unwrap();
        })
    })
    .await;

    assert!(result.is_err());
}

async fn read_server_line(server: &mut tokio::io::DuplexStream) -> String {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        server.read_exact(&mut byte).await.unwrap();
        if byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
    }

    String::from_utf8(line)
        .unwrap()
        .trim_end_matches('\r')
        .to_owned()
}

#[test]
fn external_initial_response_is_decimal_uid() {
    let mechanism = External::new(1000);
    assert_eq!(mechanism.initial_response(), b"1000");
    assert_eq!(mechanism.name(), "EXTERNAL");
}

#[test]
fn anonymous_initial_response_is_trace_string() {
    let mechanism = Anonymous::new("hello");
    assert_eq!(mechanism.initial_response(), b"hello");
    assert_eq!(mechanism.name(), "ANONYMOUS");
}

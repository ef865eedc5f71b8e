use async_trait::async_trait;
use mailgram::app::AppState;
use mailgram::models::log::delivery_record::DeliveryRecord;
use mailgram::transport::{ChatTransport, MarkupMode, TransportError};
use mailgram::{db, http};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Everything the fake transport was asked to send, in call order.
#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Text {
        chat_id: i64,
        content: String,
        markup: MarkupMode,
    },
    Image {
        chat_id: i64,
        size: usize,
        caption: String,
    },
    File {
        chat_id: i64,
        filename: String,
        caption: String,
    },
}

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    fail_files: bool,
}

impl RecordingTransport {
    fn failing_files() -> Self {
        RecordingTransport {
            sent: Mutex::new(Vec::new()),
            fail_files: true,
        }
    }

    async fn calls(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(
        &self,
        chat_id: i64,
        content: &str,
        markup: MarkupMode,
    ) -> Result<(), TransportError> {
        self.sent.lock().await.push(Sent::Text {
            chat_id,
            content: content.to_string(),
            markup,
        });
        Ok(())
    }

    async fn send_image(
        &self,
        chat_id: i64,
        bytes: &[u8],
        caption: &str,
    ) -> Result<(), TransportError> {
        self.sent.lock().await.push(Sent::Image {
            chat_id,
            size: bytes.len(),
            caption: caption.to_string(),
        });
        Ok(())
    }

    async fn send_file(
        &self,
        chat_id: i64,
        _bytes: &[u8],
        filename: &str,
        caption: &str,
    ) -> Result<(), TransportError> {
        self.sent.lock().await.push(Sent::File {
            chat_id,
            filename: filename.to_string(),
            caption: caption.to_string(),
        });
        if self.fail_files {
            return Err(TransportError::Api("file uploads are down".to_string()));
        }
        Ok(())
    }
}

async fn start_server_with(
    transport: Arc<RecordingTransport>,
) -> (String, SqlitePool, JoinHandle<()>) {
    let db_url = db::ensure_sqlite_path("sqlite://:memory:");
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("connect memory sqlite");
    db::run_migrations(&pool).await.expect("migrate");
    let state = AppState {
        db: pool.clone(),
        transport,
        max_message_len: 4096,
    };
    let app = http::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), pool, handle)
}

async fn start_server() -> (String, SqlitePool, Arc<RecordingTransport>, JoinHandle<()>) {
    let transport = Arc::new(RecordingTransport::default());
    let (base, pool, handle) = start_server_with(transport.clone()).await;
    (base, pool, transport, handle)
}

/// Seed a user and one registered alias, the way the account bot would.
async fn register_alias(pool: &SqlitePool, telegram_id: i64, address: &str) {
    sqlx::query(
        "INSERT INTO users (telegram_id, username, first_name, credits, created_at) VALUES (?, ?, ?, 1, ?)",
    )
    .bind(telegram_id)
    .bind("tester")
    .bind("Test")
    .bind(chrono::Utc::now())
    .execute(pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO user_emails (user_id, email_address, created_at) VALUES (?, ?, ?)")
        .bind(telegram_id)
        .bind(address)
        .bind(chrono::Utc::now())
        .execute(pool)
        .await
        .unwrap();
}

async fn post_eml(base: &str, eml: &[u8]) -> serde_json::Value {
    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/webhook/email", base))
        .body(eml.to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    res.json().await.unwrap()
}

async fn delivery_records(pool: &SqlitePool) -> Vec<DeliveryRecord> {
    sqlx::query_as(
        "SELECT id, user_id, sender, receiver, subject, body, timestamp FROM email_logs ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn short_plain_text_email_fits_one_message() {
    let (base, pool, transport, _srv) = start_server().await;
    register_alias(&pool, 1001, "alice@example.com").await;

    let eml = concat!(
        "From: sender@remote.test\r\n",
        "To: Alice <ALICE@example.com>\r\n",
        "Subject: Quarterly report\r\n",
        "Date: Thu, 7 Aug 2025 10:00:00 +0000\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "All numbers are up.\r\n",
    );
    let reply = post_eml(&base, eml.as_bytes()).await;

    assert_eq!(reply["status"], "success");
    assert_eq!(reply["email_info"]["delivered_to"], 1001);
    assert_eq!(reply["email_info"]["to"], "alice@example.com");

    let records = delivery_records(&pool).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, 1001);
    assert_eq!(records[0].sender, "sender@remote.test");
    assert_eq!(records[0].receiver, "alice@example.com");
    assert_eq!(records[0].subject.as_deref(), Some("Quarterly report"));
    assert!(records[0].body.as_deref().unwrap().contains("All numbers are up."));

    // Header and body fit the limit together: exactly one combined send.
    let calls = transport.calls().await;
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        Sent::Text {
            chat_id,
            content,
            markup,
        } => {
            assert_eq!(*chat_id, 1001);
            assert_eq!(*markup, MarkupMode::Html);
            assert!(content.starts_with("📧 <b>New Email Received!</b>"));
            assert!(content.contains("<code>sender@remote.test</code>"));
            assert!(content.contains("All numbers are up."));
        }
        other => panic!("expected a text send, got {other:?}"),
    }
}

#[tokio::test]
async fn long_body_sends_header_then_labeled_part() {
    let (base, pool, transport, _srv) = start_server().await;
    register_alias(&pool, 1001, "alice@example.com").await;

    // 200 lines of 20 chars: too long combined with the header, but one
    // labeled body part is enough on its own.
    let body = "All numbers are up.\n".repeat(200);
    let eml = format!(
        "From: sender@remote.test\r\nTo: alice@example.com\r\nSubject: Long one\r\nContent-Type: text/plain\r\n\r\n{}",
        body
    );
    let reply = post_eml(&base, eml.as_bytes()).await;
    assert_eq!(reply["status"], "success");

    let calls = transport.calls().await;
    assert_eq!(calls.len(), 2, "expected header + one body part");
    match (&calls[0], &calls[1]) {
        (Sent::Text { content: first, .. }, Sent::Text { content: second, .. }) => {
            assert!(first.starts_with("📧 <b>New Email Received!</b>"));
            assert!(second.starts_with("📄 <b>Part 1</b>"));
        }
        other => panic!("expected two text sends, got {other:?}"),
    }
}

#[tokio::test]
async fn image_attachment_goes_out_inline_after_body() {
    let (base, pool, transport, _srv) = start_server().await;
    register_alias(&pool, 1001, "alice@example.com").await;

    let eml = concat!(
        "From: cam@remote.test\r\n",
        "To: alice@example.com\r\n",
        "Subject: Snapshot\r\n",
        "MIME-Version: 1.0\r\n",
        "Content-Type: multipart/mixed; boundary=BOUND\r\n",
        "\r\n",
        "--BOUND\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "See attached.\r\n",
        "--BOUND\r\n",
        "Content-Type: image/png\r\n",
        "Content-Disposition: attachment; filename=\"pic.png\"\r\n\r\n",
        "abc\r\n",
        "--BOUND--\r\n",
    );
    let reply = post_eml(&base, eml.as_bytes()).await;
    assert_eq!(reply["status"], "success");

    let calls = transport.calls().await;
    let image_pos = calls
        .iter()
        .position(|c| matches!(c, Sent::Image { .. }))
        .expect("an inline image send");
    match &calls[image_pos] {
        Sent::Image {
            chat_id,
            size,
            caption,
        } => {
            assert_eq!(*chat_id, 1001);
            assert_eq!(*size, 3);
            assert!(caption.contains("pic.png"));
        }
        _ => unreachable!(),
    }
    // All text parts precede the attachment.
    assert!(
        calls[..image_pos]
            .iter()
            .all(|c| matches!(c, Sent::Text { .. })),
        "attachment delivered before the message body"
    );
}

#[tokio::test]
async fn attachments_are_capped_at_ten() {
    let (base, pool, transport, _srv) = start_server().await;
    register_alias(&pool, 1001, "alice@example.com").await;

    let mut eml = String::from(
        "From: bulk@remote.test\r\nTo: alice@example.com\r\nSubject: Many files\r\nMIME-Version: 1.0\r\nContent-Type: multipart/mixed; boundary=BOUND\r\n\r\n--BOUND\r\nContent-Type: text/plain\r\n\r\nfiles below\r\n",
    );
    for i in 0..12 {
        eml.push_str(&format!(
            "--BOUND\r\nContent-Type: application/octet-stream\r\nContent-Disposition: attachment; filename=\"f{i}.bin\"\r\n\r\nDATA{i}\r\n"
        ));
    }
    eml.push_str("--BOUND--\r\n");

    let reply = post_eml(&base, eml.as_bytes()).await;
    assert_eq!(reply["status"], "success");

    let calls = transport.calls().await;
    let files: Vec<&Sent> = calls
        .iter()
        .filter(|c| matches!(c, Sent::File { .. }))
        .collect();
    assert_eq!(files.len(), 10, "only the first ten attachments go out");
    match files[0] {
        Sent::File { filename, .. } => assert_eq!(filename, "f0.bin"),
        _ => unreachable!(),
    }
    match files[9] {
        Sent::File { filename, .. } => assert_eq!(filename, "f9.bin"),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn unregistered_recipient_gets_error_payload_and_nothing_else() {
    let (base, pool, transport, _srv) = start_server().await;
    register_alias(&pool, 1001, "alice@example.com").await;

    let eml = concat!(
        "From: sender@remote.test\r\n",
        "To: bob@unknown.com\r\n",
        "Subject: Hello\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "Hi\r\n",
    );
    let reply = post_eml(&base, eml.as_bytes()).await;

    assert_eq!(reply["status"], "error");
    assert!(
        reply["message"]
            .as_str()
            .unwrap()
            .contains("bob@unknown.com")
    );
    assert!(reply.get("email_info").is_none());
    assert_eq!(delivery_records(&pool).await.len(), 0);
    assert!(transport.calls().await.is_empty());
}

#[tokio::test]
async fn garbage_bytes_still_answer_200_with_error_status() {
    let (base, _pool, transport, _srv) = start_server().await;

    let reply = post_eml(&base, b"\xff\xfe\x00 not mime at all").await;
    assert_eq!(reply["status"], "error");
    assert!(transport.calls().await.is_empty());
}

#[tokio::test]
async fn failed_attachment_sends_do_not_fail_the_webhook() {
    let transport = Arc::new(RecordingTransport::failing_files());
    let (base, pool, _srv) = start_server_with(transport.clone()).await;
    register_alias(&pool, 1001, "alice@example.com").await;

    let eml = concat!(
        "From: sender@remote.test\r\n",
        "To: alice@example.com\r\n",
        "Subject: Files\r\n",
        "MIME-Version: 1.0\r\n",
        "Content-Type: multipart/mixed; boundary=BOUND\r\n",
        "\r\n",
        "--BOUND\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "two files\r\n",
        "--BOUND\r\n",
        "Content-Type: application/pdf\r\n",
        "Content-Disposition: attachment; filename=\"a.pdf\"\r\n\r\n",
        "AAA\r\n",
        "--BOUND\r\n",
        "Content-Type: application/pdf\r\n",
        "Content-Disposition: attachment; filename=\"b.pdf\"\r\n\r\n",
        "BBB\r\n",
        "--BOUND--\r\n",
    );
    let reply = post_eml(&base, eml.as_bytes()).await;

    // Both sends were attempted despite the first failing, and the relay
    // still sees success.
    assert_eq!(reply["status"], "success");
    let calls = transport.calls().await;
    let files: Vec<&Sent> = calls
        .iter()
        .filter(|c| matches!(c, Sent::File { .. }))
        .collect();
    assert_eq!(files.len(), 2);
    assert_eq!(delivery_records(&pool).await.len(), 1);
}

#[tokio::test]
async fn empty_attachment_payload_is_skipped_silently() {
    let (base, pool, transport, _srv) = start_server().await;
    register_alias(&pool, 1001, "alice@example.com").await;

    let eml = concat!(
        "From: sender@remote.test\r\n",
        "To: alice@example.com\r\n",
        "Subject: Empty file\r\n",
        "MIME-Version: 1.0\r\n",
        "Content-Type: multipart/mixed; boundary=BOUND\r\n",
        "\r\n",
        "--BOUND\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "nothing attached really\r\n",
        "--BOUND\r\n",
        "Content-Type: application/octet-stream\r\n",
        "Content-Disposition: attachment; filename=\"empty.bin\"\r\n\r\n",
        "\r\n",
        "--BOUND--\r\n",
    );
    let reply = post_eml(&base, eml.as_bytes()).await;

    assert_eq!(reply["status"], "success");
    let calls = transport.calls().await;
    assert!(
        calls
            .iter()
            .all(|c| !matches!(c, Sent::File { .. } | Sent::Image { .. })),
        "empty attachment should produce no transport call"
    );
}

#[tokio::test]
async fn status_route_reports_service_identity() {
    let (base, _pool, _transport, _srv) = start_server().await;

    let client = reqwest::Client::new();
    let res = client.get(format!("{}/", base)).send().await.unwrap();
    assert!(res.status().is_success());
    let v: serde_json::Value = res.json().await.unwrap();
    assert!(v["status"].as_str().unwrap().contains("mailgram"));
}

use super::*;
use crate::generator::StagedGenerator;

async fn setup() -> ApiContext {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    ApiContext {
        storage,
        generator: Arc::new(StagedGenerator::default()),
    }
}

fn write_request(client_id: Option<&str>, position: usize) -> SessionWriteRequest {
    SessionWriteRequest {
        client_id: client_id.map(str::to_string),
        history: vec![Answer::new("q0", true)],
        position,
        cards: vec![
            Card::question(0, "q0", "screening"),
            Card::question(1, "q1", "screening"),
        ],
    }
}

#[tokio::test]
async fn unknown_client_reads_an_empty_session() {
    let ctx = setup().await;
    let session = read_session(&ctx, Some("fresh")).await.expect("read");
    assert_eq!(session.client_id.as_ref().map(ClientId::as_str), Some("fresh"));
    assert!(!session.has_session());
    assert_eq!(session.position, 0);
}

#[tokio::test]
async fn missing_or_blank_client_id_is_rejected() {
    let ctx = setup().await;
    let err = read_session(&ctx, None).await.expect_err("missing id");
    assert!(matches!(err.code, ErrorCode::Validation));
    let err = delete_session(&ctx, Some("  ")).await.expect_err("blank id");
    assert!(matches!(err.code, ErrorCode::Validation));
    let err = write_session(&ctx, write_request(Some(""), 1))
        .await
        .expect_err("blank id");
    assert!(matches!(err.code, ErrorCode::Validation));
}

#[tokio::test]
async fn written_session_reads_back_and_deletes() {
    let ctx = setup().await;
    write_session(&ctx, write_request(Some("alice"), 1))
        .await
        .expect("write");

    let session = read_session(&ctx, Some("alice")).await.expect("read");
    assert!(session.has_session());
    assert_eq!(session.position, 1);
    assert_eq!(session.history, vec![Answer::new("q0", true)]);

    delete_session(&ctx, Some("alice")).await.expect("delete");
    delete_session(&ctx, Some("alice")).await.expect("idempotent");
    assert!(!read_session(&ctx, Some("alice"))
        .await
        .expect("read")
        .has_session());
}

#[tokio::test]
async fn generate_cards_uses_configured_generator() {
    let ctx = ApiContext {
        generator: Arc::new(StagedGenerator::new(3, 0)),
        ..setup().await
    };
    let response = generate_cards(
        &ctx,
        &GenerateCardsRequest {
            history: Vec::new(),
            current_count: 5,
        },
    );
    let ids: Vec<i64> = response.cards.iter().map(|card| card.id.0).collect();
    assert_eq!(ids, vec![5, 6, 7]);
}

#[tokio::test]
async fn position_past_the_cards_is_rejected() {
    let ctx = setup().await;
    let err = write_session(&ctx, write_request(Some("alice"), 3))
        .await
        .expect_err("position past cards");
    assert!(matches!(err.code, ErrorCode::Validation));

    let err = write_session(&ctx, write_request(Some("alice"), usize::MAX))
        .await
        .expect_err("position overflow");
    assert!(matches!(err.code, ErrorCode::Validation));
    assert_eq!(ctx.storage.count_sessions().await.expect("count"), 0);

    write_session(&ctx, write_request(Some("alice"), 2))
        .await
        .expect("position at the end is a completed session");
}

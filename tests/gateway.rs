//! Gateway tests against the in-process CMS/AI mock.

mod common;

use bylines::assist::{AssistGateway, ChatRole, SUMMARY_APOLOGY};
use bylines::cms::{ContentGateway, ContentSource, BIO_PLACEHOLDER, FALLBACK_BANNER_URL};
use bylines::error::{AssistError, CmsError};
use bylines::site::{diagnose, load_site};
use bylines_core::audio::{decode_pcm16, SPEECH_CHANNELS, SPEECH_SAMPLE_RATE};
use bylines_core::navigation::{MemoryHistory, Navigator, Page};
use bylines_core::theme::Theme;

use common::{start_mock, SPEECH_PCM};

#[tokio::test]
async fn test_fetch_articles_maps_and_skips() {
    let mock = start_mock();
    let gw = ContentGateway::from_config(&mock.config().cms).unwrap();

    let articles = gw.fetch_articles().await.unwrap();
    assert_eq!(articles.len(), 2);

    let first = &articles[0];
    assert_eq!(first.id, "post-2");
    assert_eq!(first.author, "Ada Lovelace");
    assert_eq!(first.date, "March 5, 2024");
    assert_eq!(first.tags, vec!["culture", "strategy"]);
    assert!(first.content.contains("Hello world"));
    assert!(first.comments.is_empty());

    let second = &articles[1];
    assert_eq!(second.id, "post-1");
    assert_eq!(second.author, "Jane Roe");
    assert_eq!(second.date, "");
    assert_eq!(second.excerpt, "");

    let requests = mock.recorder.requests();
    let query = requests
        .iter()
        .find(|r| r.contains("/entries?"))
        .expect("entries request recorded");
    assert!(query.contains("/spaces/space1/environments/master/entries"));
    assert!(query.contains("content_type=blogPost"));
    assert!(query.contains("order=-fields.writtendate"));
    assert!(query.contains("include=1"));
}

#[tokio::test]
async fn test_invalid_token_is_auth_error() {
    let mock = start_mock();
    let mut config = mock.config();
    config.cms.access_token = Some("wrong".into());
    let gw = ContentGateway::from_config(&config.cms).unwrap();

    assert_eq!(gw.fetch_articles().await, Err(CmsError::Auth));
    assert_eq!(gw.fetch_bio_description().await, Err(CmsError::Auth));
    // Assets never fail.
    assert_eq!(gw.fetch_asset_url("banner").await, FALLBACK_BANNER_URL);
}

#[tokio::test]
async fn test_unknown_content_type_is_schema_error() {
    let mock = start_mock();
    let mut config = mock.config();
    config.cms.content_type_id = Some("nope".into());
    let gw = ContentGateway::from_config(&config.cms).unwrap();

    match gw.fetch_articles().await {
        Err(CmsError::Schema {
            content_type,
            message,
        }) => {
            assert_eq!(content_type, "nope");
            assert!(message.contains("\"nope\""));
        }
        other => panic!("expected schema error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_connection_error() {
    let mock = start_mock();
    let mut config = mock.config();
    config.cms.content_type_id = Some("flaky".into());
    let gw = ContentGateway::from_config(&config.cms).unwrap();

    let err = gw.fetch_articles().await.unwrap_err();
    assert_eq!(err.code(), "connection");
}

#[tokio::test]
async fn test_bio_description_and_placeholder() {
    let mock = start_mock();
    let mut config = mock.config();
    let gw = ContentGateway::from_config(&config.cms).unwrap();
    let bio = gw.fetch_bio_description().await.unwrap();
    assert!(bio.contains("I write about leadership."));

    config.cms.bio_content_type = "emptyBio".into();
    let gw = ContentGateway::from_config(&config.cms).unwrap();
    assert_eq!(gw.fetch_bio_description().await.unwrap(), BIO_PLACEHOLDER);
}

#[tokio::test]
async fn test_asset_urls() {
    let mock = start_mock();
    let gw = ContentGateway::from_config(&mock.config().cms).unwrap();

    assert_eq!(
        gw.fetch_asset_url("banner").await,
        "https://images.ctfassets.net/banner.jpg"
    );
    assert_eq!(gw.fetch_asset_url("nofile").await, FALLBACK_BANNER_URL);
    assert_eq!(gw.fetch_asset_url("missing").await, FALLBACK_BANNER_URL);
}

#[tokio::test]
async fn test_asset_without_credentials_makes_no_request() {
    let mock = start_mock();
    let mut config = mock.config();
    config.cms.space_id = None;
    let gw = ContentGateway::from_config(&config.cms).unwrap();

    assert_eq!(gw.fetch_asset_url("banner").await, FALLBACK_BANNER_URL);
    assert!(mock.recorder.requests().is_empty());
}

#[tokio::test]
async fn test_content_type_inspector() {
    let mock = start_mock();
    let gw = ContentGateway::from_config(&mock.config().cms).unwrap();

    let fields = gw.fetch_content_type("blogPost").await.unwrap();
    let ids: Vec<&str> = fields.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["title", "writtendate", "body"]);

    let err = gw.fetch_content_type("ghost").await.unwrap_err();
    assert_eq!(err.code(), "schema");
    assert!(err.to_string().contains("\"ghost\""));
}

#[tokio::test]
async fn test_load_site_and_navigate() {
    let mock = start_mock();
    let config = mock.config();
    let gw = ContentGateway::from_config(&config.cms).unwrap();

    let content = load_site(&gw, &config.site).await.unwrap();
    assert_eq!(content.bio.name, config.site.owner_name);
    assert_eq!(
        content.banner_url,
        format!("https://images.ctfassets.net/{}.jpg", config.site.banner_asset_id)
    );

    // Deep link straight into an article, then back to the listing.
    let mut nav = Navigator::new(content, MemoryHistory::new("/?articleId=post-1"), Theme::Dark);
    assert_eq!(nav.selected_article().map(|a| a.title.as_str()), Some("First Steps"));
    let t = nav.go_back();
    assert_eq!(t.pushed.as_deref(), Some("/?page=articles"));
    assert_eq!(nav.state().page, Page::Articles);
}

#[tokio::test]
async fn test_failed_load_is_diagnosed() {
    let mock = start_mock();
    let mut config = mock.config();
    config.cms.bio_content_type = "missingBio".into();
    let gw = ContentGateway::from_config(&config.cms).unwrap();

    let err = load_site(&gw, &config.site).await.unwrap_err();
    assert_eq!(err.code(), "schema");
    assert!(err.to_string().contains("'missingBio'"));

    let diagnosis = diagnose(&gw, &err).await;
    assert_eq!(diagnosis.content_type.as_deref(), Some("blogPost"));
    assert_eq!(diagnosis.fields.len(), 3);
}

#[tokio::test]
async fn test_summarize() {
    let mock = start_mock();
    let config = mock.config();
    let gw = AssistGateway::from_config(&config.ai, "Ada").unwrap();

    assert_eq!(gw.summarize("<p>Some <b>article</b></p>").await, "A short summary.");
    assert!(mock
        .recorder
        .requests()
        .contains(&"POST gemini-2.5-flash:generateContent".to_string()));

    let mut bad = config.ai.clone();
    bad.api_key = Some("wrong".into());
    let gw = AssistGateway::from_config(&bad, "Ada").unwrap();
    assert_eq!(gw.summarize("<p>text</p>").await, SUMMARY_APOLOGY);
}

#[tokio::test]
async fn test_speech_returns_pcm() {
    let mock = start_mock();
    let gw = AssistGateway::from_config(&mock.config().ai, "Ada").unwrap();

    let pcm = gw.synthesize_speech("<p>Read me</p>").await.unwrap();
    assert_eq!(pcm, SPEECH_PCM.to_vec());
    let clip = decode_pcm16(&pcm, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS).unwrap();
    assert_eq!(clip.frames(), 2);

    assert_eq!(gw.synthesize_speech("<p>silence</p>").await, None);
    assert_eq!(gw.synthesize_speech("<p>fail</p>").await, None);
}

#[tokio::test]
async fn test_chat_keeps_session_across_failures() {
    let mock = start_mock();
    let gw = AssistGateway::from_config(&mock.config().ai, "Ada").unwrap();
    let mut session = None;

    let reply = gw.chat(&mut session, "hello").await.unwrap();
    assert_eq!(reply, "reply to 'hello' after 1 turn(s)");
    assert_eq!(session.as_ref().unwrap().history.len(), 2);

    let err = gw.chat(&mut session, "please fail").await.unwrap_err();
    assert!(matches!(err, AssistError::Request(_)));
    assert_eq!(session.as_ref().unwrap().history.len(), 2);

    let reply = gw.chat(&mut session, "again").await.unwrap();
    assert_eq!(reply, "reply to 'again' after 3 turn(s)");

    let history = &session.unwrap().history;
    assert_eq!(history.len(), 4);
    assert_eq!(history[2].role, ChatRole::User);
    assert_eq!(history[2].text, "again");
}

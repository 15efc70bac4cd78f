//! Integration tests for the full inspect-then-download pipeline.
//!
//! Each test runs against its own wiremock server and its own output root
//! under the system temp directory, so tests stay isolated from each other.

use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use podget::batch::{BatchSummary, FeedOutcome, Pipeline, RunMode};
use podget::config::Config;
use podget::episode::{DownloadOutcome, EpisodeFetcher, OverwritePolicy};
use podget::feed::{ContentSource, FeedEndpoint, FeedInspector};
use podget::serverlist;

const AUDIO: &[u8] = b"ID3\x04\x00 not really an mp3";

fn rss(guid: &str, pub_date: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test show</title>
    <item>
      <title>Newest</title>
      <guid>{guid}</guid>
      <pubDate>{pub_date}</pubDate>
    </item>
    <item>
      <title>Older</title>
      <guid>{guid}.old</guid>
      <pubDate>Mon, 24 Apr 2023 10:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#
    )
}

fn output_root(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("podget_pipeline_test_{}", name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn pipeline(root: &Path, policy: OverwritePolicy) -> Pipeline {
    let client = reqwest::Client::new();
    let timeout = Duration::from_secs(5);
    Pipeline::new(
        FeedInspector::new(client.clone(), ContentSource::Guid, timeout),
        EpisodeFetcher::new(client, root.to_path_buf(), policy, timeout),
    )
}

async fn mount_feed(server: &MockServer, feed_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(feed_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/rss+xml"),
        )
        .mount(server)
        .await;
}

async fn mount_media(server: &MockServer, media_path: &str) {
    Mock::given(method("GET"))
        .and(path(media_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(AUDIO))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_latest_episode_saved_by_date() {
    let server = MockServer::start().await;
    let media_url = format!("{}/media/episode.mp3", server.uri());
    mount_feed(&server, "/papous.xml", rss(&media_url, "Mon, 01 May 2023 10:00:00 GMT")).await;
    mount_media(&server, "/media/episode.mp3").await;

    let root = output_root("latest");
    let reports = pipeline(&root, OverwritePolicy::Overwrite)
        .run_all(
            vec![FeedEndpoint {
                url: format!("{}/papous.xml", server.uri()),
                nickname: "Papous".to_string(),
            }],
            4,
            RunMode::Download,
        )
        .await;

    assert_eq!(reports.len(), 1);
    let expected = root.join("Papous").join("2023-05-01.mp3");
    match &reports[0].result {
        Ok(FeedOutcome::Downloaded(DownloadOutcome::Written { path, bytes })) => {
            assert_eq!(path, &expected);
            assert_eq!(*bytes, AUDIO.len() as u64);
        }
        other => panic!("Expected a written episode, got {:?}", other),
    }
    assert_eq!(std::fs::read(&expected).unwrap(), AUDIO);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_media_without_extension() {
    let server = MockServer::start().await;
    let media_url = format!("{}/media/episode", server.uri());
    mount_feed(&server, "/feed.xml", rss(&media_url, "Sun, 7 Jan 2024 06:00:00 +0100")).await;
    mount_media(&server, "/media/episode").await;

    let root = output_root("no_ext");
    let reports = pipeline(&root, OverwritePolicy::Overwrite)
        .run_all(
            vec![FeedEndpoint {
                url: format!("{}/feed.xml", server.uri()),
                nickname: "Bare".to_string(),
            }],
            1,
            RunMode::Download,
        )
        .await;

    assert!(reports[0].result.is_ok(), "{:?}", reports[0].result);
    let names: Vec<String> = std::fs::read_dir(root.join("Bare"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["2024-01-07".to_string()]);

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_one_failing_feed_does_not_stop_others() {
    let server = MockServer::start().await;
    let media_url = format!("{}/media/good.mp3", server.uri());
    mount_feed(&server, "/good.xml", rss(&media_url, "Mon, 01 May 2023 10:00:00 GMT")).await;
    mount_media(&server, "/media/good.mp3").await;
    mount_feed(
        &server,
        "/bad-date.xml",
        rss(&media_url, "Mon, 01 Mai 2023 10:00:00 GMT"),
    )
    .await;
    mount_feed(
        &server,
        "/no-item.xml",
        r#"<rss version="2.0"><channel><title>Empty</title></channel></rss>"#.to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/gone.xml"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let endpoints: Vec<FeedEndpoint> = [
        ("/gone.xml", "Gone"),
        ("/bad-date.xml", "BadDate"),
        ("/good.xml", "Good"),
        ("/no-item.xml", "NoItem"),
    ]
    .iter()
    .map(|(p, nick)| FeedEndpoint {
        url: format!("{}{}", server.uri(), p),
        nickname: nick.to_string(),
    })
    .collect();

    let root = output_root("isolation");
    let reports = pipeline(&root, OverwritePolicy::Overwrite)
        .run_all(endpoints, 2, RunMode::Download)
        .await;

    // Reports keep input order
    let summary: Vec<(String, Option<&'static str>)> = reports
        .iter()
        .map(|r| (r.nickname.clone(), r.result.as_ref().err().map(|e| e.kind())))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Gone".to_string(), Some("FetchError")),
            ("BadDate".to_string(), Some("DateParseError")),
            ("Good".to_string(), None),
            ("NoItem".to_string(), Some("ParseError")),
        ]
    );
    assert_eq!(
        BatchSummary::from_reports(&reports),
        BatchSummary {
            written: 1,
            skipped: 0,
            planned: 0,
            failed: 3
        }
    );
    assert!(root.join("Good").join("2023-05-01.mp3").exists());
    assert!(!root.join("Gone").exists());

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let server = MockServer::start().await;
    let media_url = format!("{}/media/episode.ogg", server.uri());
    mount_feed(&server, "/feed.xml", rss(&media_url, "Tue, 12 Dec 2023 20:00:00 GMT")).await;
    Mock::given(method("GET"))
        .and(path("/media/episode.ogg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(AUDIO))
        .expect(0)
        .mount(&server)
        .await;

    let root = output_root("dry_run");
    let reports = pipeline(&root, OverwritePolicy::Overwrite)
        .run_all(
            vec![FeedEndpoint {
                url: format!("{}/feed.xml", server.uri()),
                nickname: "Show".to_string(),
            }],
            1,
            RunMode::DryRun,
        )
        .await;

    match &reports[0].result {
        Ok(FeedOutcome::Planned {
            target,
            content_url,
        }) => {
            assert_eq!(target.full_path, root.join("Show").join("2023-12-12.ogg"));
            assert_eq!(content_url, &media_url);
        }
        other => panic!("Expected a planned download, got {:?}", other),
    }
    assert!(!root.join("Show").exists());

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_second_run_skips_when_asked() {
    let server = MockServer::start().await;
    let media_url = format!("{}/media/episode.mp3", server.uri());
    mount_feed(&server, "/feed.xml", rss(&media_url, "Mon, 01 May 2023 10:00:00 GMT")).await;
    Mock::given(method("GET"))
        .and(path("/media/episode.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(AUDIO))
        .expect(1)
        .mount(&server)
        .await;

    let root = output_root("second_run");
    let endpoint = FeedEndpoint {
        url: format!("{}/feed.xml", server.uri()),
        nickname: "Papous".to_string(),
    };
    let pipeline = pipeline(&root, OverwritePolicy::SkipIfExists);

    let first = pipeline.run_one(&endpoint, RunMode::Download).await;
    assert!(matches!(
        first.result,
        Ok(FeedOutcome::Downloaded(DownloadOutcome::Written { .. }))
    ));
    let second = pipeline.run_one(&endpoint, RunMode::Download).await;
    assert!(matches!(
        second.result,
        Ok(FeedOutcome::Downloaded(DownloadOutcome::Skipped { .. }))
    ));

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test]
async fn test_serverlist_to_pipeline() {
    let server = MockServer::start().await;
    let media_url = format!("{}/media/episode.mp3", server.uri());
    mount_feed(&server, "/feed.xml", rss(&media_url, "Mon, 01 May 2023 10:00:00 GMT")).await;
    mount_media(&server, "/media/episode.mp3").await;

    let content = format!(
        "# podcasts\n{0}/feed.xml Papous\n{0}/feed.xml\nnot-a-url Broken\n",
        server.uri()
    );
    let endpoints = serverlist::parse(&content);
    assert_eq!(endpoints.len(), 1);

    let root = output_root("serverlist");
    let config = Config {
        output_root: root.display().to_string(),
        ..Config::default()
    };
    let pipeline = Pipeline::from_config(&config, config.resolve_output_root().unwrap()).unwrap();
    let reports = pipeline
        .run_all(endpoints, config.effective_concurrency(), RunMode::Download)
        .await;

    assert_eq!(BatchSummary::from_reports(&reports).written, 1);
    assert_eq!(
        std::fs::read(root.join("Papous").join("2023-05-01.mp3")).unwrap(),
        AUDIO
    );

    std::fs::remove_dir_all(&root).ok();
}

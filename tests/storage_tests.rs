use liferecord::config::AppConfig;
use liferecord::storage::{MockMediaStorage, S3MediaStorage, StorageService, sanitize_key};

mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn mock_presign_embeds_the_key() {
        let mock = MockMediaStorage::new();
        let result = mock
            .presign_media_upload("media/clip.mp4", "video/mp4")
            .await;

        let url = result.unwrap();
        assert!(url.contains("signature=fake"));
        assert!(url.contains("media/clip.mp4"));
    }

    #[tokio::test]
    async fn failing_mock_reports_an_error() {
        let mock = MockMediaStorage::new_failing();
        let result = mock.presign_media_upload("media/clip.mp4", "video/mp4").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn mock_urls_never_contain_traversal_segments() {
        let mock = MockMediaStorage::new();
        let url = mock
            .presign_media_upload("../../etc/passwd", "image/png")
            .await
            .unwrap();
        assert!(!url.contains(".."));
    }
}

mod key_tests {
    use super::*;

    #[test]
    fn traversal_and_empty_segments_are_stripped() {
        assert_eq!(sanitize_key("media/../secret/./a.png"), "media/secret/a.png");
        assert_eq!(sanitize_key("//media//a.png"), "media/a.png");
        assert_eq!(sanitize_key("media/a.png"), "media/a.png");
    }
}

mod s3_tests {
    use super::*;

    #[tokio::test]
    async fn client_builds_from_default_config() {
        // Construction only; no network traffic happens until a request.
        let _client = S3MediaStorage::new(&AppConfig::default()).await;
    }
}

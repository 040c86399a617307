//! [`BilibiliComics`]: the source facade tying the pipeline, the session and
//! the API calls together.

use std::sync::Arc;

use reqwest::cookie::Jar;
use tracing::{debug, instrument};

use crate::api::{ApiUrls, episode_to_chapter, parse_comic_detail, parse_image_token};
use crate::auth::{
    AuthMiddleware, CookieSource, MemorySessionStore, Session, SessionStore, TokenRefresher,
};
use crate::config::SourceConfig;
use crate::entitlement::accessible_episodes;
use crate::error::SourceError;
use crate::http::{
    HostRateLimit, Middleware, Pipeline, ReqwestTransport, Transport, default_client, post_json,
};
use crate::locale::Locale;
use crate::models::{Chapter, ChapterRef, ComicIdPayload, ComicRef, ImageTokenPayload, Page};

pub struct BilibiliComics {
    config: SourceConfig,
    urls: ApiUrls,
    session: Arc<Session>,
    pipeline: Pipeline,
}

impl BilibiliComics {
    /// Create a client whose session is read from `jar`. The same jar backs
    /// the HTTP client.
    pub fn new(config: SourceConfig, jar: Arc<Jar>) -> Result<Self, SourceError> {
        Self::builder(config).jar(jar).build()
    }

    pub fn builder(config: SourceConfig) -> BilibiliComicsBuilder {
        BilibiliComicsBuilder::new(config)
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn locale(&self) -> Locale {
        self.config.locale
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn urls(&self) -> &ApiUrls {
        &self.urls
    }

    pub(crate) fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Chapters of `comic` the current user can read, in API order.
    ///
    /// Anonymous users get every episode; signed-in users get free and
    /// unlocked episodes only.
    #[instrument(skip(self), fields(comic_id = comic.comic_id))]
    pub async fn chapter_list(&self, comic: &ComicRef) -> Result<Vec<Chapter>, SourceError> {
        let url = self.urls.comic("ComicDetail")?;
        let request = post_json(
            url,
            &self.urls.page_url(&comic.path()),
            &ComicIdPayload {
                comic_id: comic.comic_id,
            },
        )?;
        let response = self.pipeline.execute(request).await?;

        let Some(detail) = parse_comic_detail(response)? else {
            return Ok(Vec::new());
        };

        self.session.sync(self.urls.base_url());
        if !self.session.is_signed_in() {
            debug!(count = detail.episodes.len(), "Anonymous chapter list");
            return Ok(detail
                .episodes
                .iter()
                .map(|episode| episode_to_chapter(episode, detail.id))
                .collect());
        }

        let unlocked = self.unlocked_episodes(detail.id).await?;
        let chapters: Vec<Chapter> = accessible_episodes(&detail.episodes, &unlocked)
            .into_iter()
            .map(|episode| episode_to_chapter(episode, detail.id))
            .collect();
        debug!(
            total = detail.episodes.len(),
            accessible = chapters.len(),
            "Signed-in chapter list"
        );
        Ok(chapters)
    }

    /// Pages of `chapter`, in reading order. Image URLs are not resolved;
    /// see [`image_url`](Self::image_url).
    #[instrument(skip(self), fields(chapter = %chapter.path()))]
    pub async fn page_list(&self, chapter: &ChapterRef) -> Result<Vec<Page>, SourceError> {
        self.session.sync(self.urls.base_url());
        if self.session.is_signed_in() {
            self.signed_in_page_list(chapter).await
        } else {
            self.image_index(chapter, None).await
        }
    }

    /// Signed URL for one page's image.
    pub async fn image_url(&self, page: &Page) -> Result<String, SourceError> {
        if let Some(url) = &page.image_url {
            return Ok(url.clone());
        }
        self.image_tokens(std::slice::from_ref(&page.path))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::Api {
                code: 0,
                message: format!("no image token for {}", page.path),
            })
    }

    /// Fill `image_url` of every page with one `ImageToken` call.
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub async fn resolve_image_urls(&self, pages: &mut [Page]) -> Result<(), SourceError> {
        if pages.is_empty() {
            return Ok(());
        }
        let paths: Vec<String> = pages.iter().map(|page| page.path.clone()).collect();
        let urls = self.image_tokens(&paths).await?;
        if urls.len() != pages.len() {
            return Err(SourceError::Api {
                code: 0,
                message: format!(
                    "expected {} image tokens, got {}",
                    pages.len(),
                    urls.len()
                ),
            });
        }
        for (page, url) in pages.iter_mut().zip(urls) {
            page.image_url = Some(url);
        }
        Ok(())
    }

    async fn image_tokens(&self, paths: &[String]) -> Result<Vec<String>, SourceError> {
        let url = self.urls.comic("ImageToken")?;
        let payload = ImageTokenPayload {
            urls: serde_json::to_string(paths)?,
        };
        let request = post_json(url, self.urls.base_url().as_str(), &payload)?;
        let response = self.pipeline.execute(request).await?;
        parse_image_token(response)
    }
}

/// Builder for [`BilibiliComics`]. Everything but the config is optional:
/// by default a fresh cookie jar, an in-memory session store and a reqwest
/// transport are used.
pub struct BilibiliComicsBuilder {
    config: SourceConfig,
    jar: Option<Arc<Jar>>,
    cookies: Option<Arc<dyn CookieSource>>,
    store: Option<Arc<dyn SessionStore>>,
    transport: Option<Arc<dyn Transport>>,
    stages: Vec<Arc<dyn Middleware>>,
}

impl BilibiliComicsBuilder {
    fn new(config: SourceConfig) -> Self {
        Self {
            config,
            jar: None,
            cookies: None,
            store: None,
            transport: None,
            stages: Vec::new(),
        }
    }

    /// Cookie jar shared by the HTTP client and the session.
    pub fn jar(mut self, jar: Arc<Jar>) -> Self {
        self.jar = Some(jar);
        self
    }

    /// Read the session cookie from `cookies` instead of the jar.
    pub fn cookies(mut self, cookies: Arc<dyn CookieSource>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Extra pipeline stage, run after authentication and before rate
    /// limiting.
    pub fn stage(mut self, stage: Arc<dyn Middleware>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Result<BilibiliComics, SourceError> {
        let config = self.config;
        let urls = ApiUrls::new(&config.base_url, config.locale.config().api_lang)?;

        let jar = self.jar.unwrap_or_default();
        let cookies: Arc<dyn CookieSource> = match self.cookies {
            Some(cookies) => cookies,
            None => jar.clone(),
        };
        let store: Arc<dyn SessionStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemorySessionStore::new()),
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(default_client(&config, Some(jar))?)),
        };

        let session = Arc::new(Session::new(cookies, store));
        let mut pipeline = Pipeline::builder(transport).stage(Arc::new(AuthMiddleware::new(
            session.clone(),
            TokenRefresher::new(urls.clone()),
        )));
        for stage in self.stages {
            pipeline = pipeline.stage(stage);
        }
        if let Some(interval) = config.rate_limit_interval()
            && let Some(host) = urls.base_url().host_str()
        {
            pipeline = pipeline.stage(Arc::new(HostRateLimit::new(host, interval)));
        }

        Ok(BilibiliComics {
            config,
            urls,
            session,
            pipeline: pipeline.build(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Region, SessionCredential};
    use crate::test_support::MockTransport;
    use reqwest::Url;
    use serde_json::json;

    fn signed_in_jar(credential: &SessionCredential) -> Arc<Jar> {
        let jar = Arc::new(Jar::default());
        jar.add_cookie_str(
            &format!(
                "access_token={}; Domain=bilibilicomics.com; Path=/",
                credential.to_cookie_value()
            ),
            &Url::parse("https://www.bilibilicomics.com/").unwrap(),
        );
        jar
    }

    fn client(transport: Arc<MockTransport>, jar: Arc<Jar>) -> BilibiliComics {
        let config = SourceConfig {
            rate_limit_per_sec: 0,
            ..SourceConfig::default()
        };
        BilibiliComics::builder(config)
            .jar(jar)
            .transport(transport)
            .build()
            .unwrap()
    }

    fn detail() -> serde_json::Value {
        json!({"code": 0, "data": {"id": 1, "title": "Comic", "ep_list": [
            {"id": 10, "ord": 1, "title": "Free", "pay_mode": 0, "pay_gold": 0},
            {"id": 11, "ord": 2, "title": "Bought", "pay_mode": 1, "pay_gold": 30},
            {"id": 12, "ord": 3, "title": "Locked", "pay_mode": 1, "pay_gold": 30}
        ]}})
    }

    fn chapter_ids(chapters: &[Chapter]) -> Vec<&str> {
        chapters.iter().map(|c| c.url.as_str()).collect()
    }

    #[tokio::test]
    async fn test_anonymous_chapter_list_has_everything() {
        let transport = MockTransport::new();
        transport.respond("ComicDetail", 200, detail());
        let client = client(transport.clone(), Arc::new(Jar::default()));

        let chapters = client.chapter_list(&ComicRef::new(1)).await.unwrap();

        assert_eq!(chapter_ids(&chapters), ["/mc1/10", "/mc1/11", "/mc1/12"]);
        assert_eq!(transport.count("GetUserEpisodes"), 0);
        let request = &transport.requests_to("ComicDetail")[0];
        assert_eq!(request.body, json!({"comic_id": 1}));
        assert_eq!(
            request.headers_named("referer"),
            ["https://www.bilibilicomics.com/detail/mc1"]
        );
    }

    #[tokio::test]
    async fn test_signed_in_chapter_list_is_filtered() {
        let transport = MockTransport::new();
        transport.respond("ComicDetail", 200, detail());
        transport.respond(
            "GetUserEpisodes",
            200,
            json!({"code": 0, "data": {"unlockedEpisodes": [{"id": 11}]}}),
        );
        let jar = signed_in_jar(&SessionCredential::new("at", "rt", Region::Us));
        let client = client(transport.clone(), jar);

        let chapters = client.chapter_list(&ComicRef::new(1)).await.unwrap();

        assert_eq!(chapter_ids(&chapters), ["/mc1/10", "/mc1/11"]);
        assert_eq!(chapters[1].name, "Ep. 2 - Bought");
        let lookup = &transport.requests_to("GetUserEpisodes")[0];
        assert_eq!(lookup.url.host_str(), Some("us-user.bilibilicomics.com"));
        assert_eq!(lookup.authorization(), Some("Bearer at"));
    }

    #[tokio::test]
    async fn test_entitlement_failure_keeps_free_chapters() {
        let transport = MockTransport::new();
        transport.respond("ComicDetail", 200, detail());
        transport.respond("GetUserEpisodes", 500, json!({}));
        let jar = signed_in_jar(&SessionCredential::new("at", "rt", Region::Us));
        let client = client(transport.clone(), jar);

        let chapters = client.chapter_list(&ComicRef::new(1)).await.unwrap();

        assert_eq!(chapter_ids(&chapters), ["/mc1/10"]);
    }

    #[tokio::test]
    async fn test_entitlement_transport_error_keeps_free_chapters() {
        let transport = MockTransport::new();
        transport.respond("ComicDetail", 200, detail());
        transport.fail("GetUserEpisodes");
        let jar = signed_in_jar(&SessionCredential::new("at", "rt", Region::Us));
        let client = client(transport.clone(), jar);

        let chapters = client.chapter_list(&ComicRef::new(1)).await.unwrap();

        assert_eq!(chapter_ids(&chapters), ["/mc1/10"]);
        assert_eq!(transport.count("GetUserEpisodes"), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_during_entitlement_lookup_propagates() {
        let transport = MockTransport::new();
        transport.respond("ComicDetail", 200, detail());
        transport.respond("GetUserEpisodes", 401, json!({"code": 401}));
        transport.respond("RefreshToken", 200, json!({"code": 1}));
        let jar = signed_in_jar(&SessionCredential::new("at", "rt", Region::Us));
        let client = client(transport.clone(), jar);

        let err = client.chapter_list(&ComicRef::new(1)).await.unwrap_err();

        assert!(err.requires_relogin());
        assert_eq!(transport.count("RefreshToken"), 1);
        assert_eq!(transport.count("GetUserEpisodes"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_rate_limit_spaces_site_requests() {
        let transport = MockTransport::new();
        transport.respond("ComicDetail", 200, json!({"code": 1}));
        let client = BilibiliComics::builder(SourceConfig::default())
            .jar(Arc::new(Jar::default()))
            .transport(transport.clone())
            .build()
            .unwrap();

        let start = tokio::time::Instant::now();
        client.chapter_list(&ComicRef::new(1)).await.unwrap();
        client.chapter_list(&ComicRef::new(1)).await.unwrap();

        assert!(start.elapsed() >= std::time::Duration::from_secs(1));
        assert_eq!(transport.count("ComicDetail"), 2);
    }

    #[tokio::test]
    async fn test_unknown_comic_has_no_chapters() {
        let transport = MockTransport::new();
        transport.respond("ComicDetail", 200, json!({"code": 1, "msg": "not found"}));
        let client = client(transport.clone(), Arc::new(Jar::default()));

        assert!(client.chapter_list(&ComicRef::new(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_page_list() {
        let transport = MockTransport::new();
        transport.respond(
            "GetImageIndex",
            200,
            json!({"code": 0, "data": {"images": [{"path": "/p/1.jpg"}, {"path": "/p/2.jpg"}]}}),
        );
        let client = client(transport.clone(), Arc::new(Jar::default()));

        let pages = client.page_list(&ChapterRef::new(1, 10)).await.unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(transport.count("GetCredential"), 0);
        assert_eq!(
            transport.requests_to("GetImageIndex")[0].body,
            json!({"ep_id": 10})
        );
    }

    #[tokio::test]
    async fn test_signed_in_page_list_exchanges_credential() {
        let transport = MockTransport::new();
        transport.respond(
            "GetCredential",
            200,
            json!({"code": 0, "data": {"credential": "page-cred"}}),
        );
        transport.respond(
            "GetImageIndex",
            200,
            json!({"code": 0, "data": {"images": [{"path": "/p/1.jpg"}]}}),
        );
        let jar = signed_in_jar(&SessionCredential::new("at", "rt", Region::Sg));
        let client = client(transport.clone(), jar);

        let pages = client.page_list(&ChapterRef::new(1, 10)).await.unwrap();

        assert_eq!(pages.len(), 1);
        let exchange = &transport.requests_to("GetCredential")[0];
        assert_eq!(exchange.url.host_str(), Some("sg-user.bilibilicomics.com"));
        assert_eq!(
            exchange.body,
            json!({"comicId": 1, "episodeId": 10, "type": 1})
        );
        assert_eq!(
            exchange.headers_named("referer"),
            ["https://www.bilibilicomics.com/mc1/10"]
        );
        assert_eq!(
            transport.requests_to("GetImageIndex")[0].body,
            json!({"ep_id": 10, "credential": "page-cred"})
        );
    }

    #[tokio::test]
    async fn test_credential_failure_aborts_page_list() {
        let transport = MockTransport::new();
        transport.respond("GetCredential", 500, json!({}));
        let jar = signed_in_jar(&SessionCredential::new("at", "rt", Region::Us));
        let client = client(transport.clone(), jar);

        let err = client.page_list(&ChapterRef::new(1, 10)).await.unwrap_err();

        assert!(matches!(err, SourceError::CredentialFetchFailed(_)));
        assert_eq!(transport.count("GetImageIndex"), 0);
    }

    #[tokio::test]
    async fn test_resolve_image_urls() {
        let transport = MockTransport::new();
        transport.respond(
            "ImageToken",
            200,
            json!({"code": 0, "data": [
                {"url": "https://cdn/1.jpg", "token": "a"},
                {"url": "https://cdn/2.jpg", "token": "b"}
            ]}),
        );
        let client = client(transport.clone(), Arc::new(Jar::default()));
        let mut pages = vec![
            Page {
                index: 0,
                path: "/p/1.jpg".to_string(),
                image_url: None,
            },
            Page {
                index: 1,
                path: "/p/2.jpg".to_string(),
                image_url: None,
            },
        ];

        client.resolve_image_urls(&mut pages).await.unwrap();

        assert_eq!(pages[1].image_url.as_deref(), Some("https://cdn/2.jpg?token=b"));
        assert_eq!(
            transport.requests_to("ImageToken")[0].body,
            json!({"urls": "[\"/p/1.jpg\",\"/p/2.jpg\"]"})
        );
        assert_eq!(
            client.image_url(&pages[0]).await.unwrap(),
            "https://cdn/1.jpg?token=a"
        );
        assert_eq!(transport.count("ImageToken"), 1);
    }
}

//! One loader per page, each tagged so a publish of that document type
//! drops every page built from it.

use serde::de::DeserializeOwned;

use crate::cache::CacheTag;
use crate::domain::content::{
    Activity, AdmissionsPage, Coop, CoopSummary, GeneralPage, GeneralPageKey, HomePage, Post,
    PostSummary, Program, ProgramSummary,
};
use crate::domain::slug::{SlugDocument, collect_slugs};

use super::fetch::{ContentFetcher, FetchError, FetchRequest};
use super::queries;

/// Cache tags, named after the CMS document types they cover.
pub mod tags {
    pub const HOME_PAGE: &str = "homePage";
    pub const POST: &str = "post";
    pub const PROGRAM: &str = "program";
    pub const COOP: &str = "coop";
    pub const ACTIVITY: &str = "activity";
    pub const ADMISSIONS_PAGE: &str = "admissionsPage";
    pub const GENERAL_PAGE: &str = "generalPage";

    /// Tag for a single general page, e.g. `generalPage:faq`.
    pub fn general_page(key: super::GeneralPageKey) -> String {
        format!("{GENERAL_PAGE}:{key}")
    }
}

/// Detail slugs listed in the sitemap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapSlugs {
    pub posts: Vec<String>,
    pub programs: Vec<String>,
    pub coops: Vec<String>,
}

#[derive(Clone)]
pub struct ContentService {
    fetcher: ContentFetcher,
}

impl ContentService {
    pub fn new(fetcher: ContentFetcher) -> Self {
        Self { fetcher }
    }

    pub async fn home_page(&self) -> Result<Option<HomePage>, FetchError> {
        let request = FetchRequest::new("homePage", queries::HOME_PAGE).tag(tags::HOME_PAGE);
        self.fetcher.fetch(&request).await
    }

    pub async fn posts(&self) -> Result<Vec<PostSummary>, FetchError> {
        let request = FetchRequest::new("posts", queries::POSTS).tag(tags::POST);
        self.list(&request).await
    }

    pub async fn post(&self, slug: &str) -> Result<Option<Post>, FetchError> {
        let request = FetchRequest::new("post", queries::POST)
            .param("slug", slug)
            .tag(tags::POST);
        self.fetcher.fetch(&request).await
    }

    pub async fn programs(&self) -> Result<Vec<ProgramSummary>, FetchError> {
        let request = FetchRequest::new("programs", queries::PROGRAMS).tag(tags::PROGRAM);
        self.list(&request).await
    }

    pub async fn program(&self, slug: &str) -> Result<Option<Program>, FetchError> {
        let request = FetchRequest::new("program", queries::PROGRAM)
            .param("slug", slug)
            .tag(tags::PROGRAM);
        self.fetcher.fetch(&request).await
    }

    pub async fn coops(&self) -> Result<Vec<CoopSummary>, FetchError> {
        let request = FetchRequest::new("coops", queries::COOPS).tag(tags::COOP);
        self.list(&request).await
    }

    pub async fn coop(&self, slug: &str) -> Result<Option<Coop>, FetchError> {
        let request = FetchRequest::new("coop", queries::COOP)
            .param("slug", slug)
            .tag(tags::COOP);
        self.fetcher.fetch(&request).await
    }

    pub async fn activities(&self) -> Result<Vec<Activity>, FetchError> {
        let request = FetchRequest::new("activities", queries::ACTIVITIES).tag(tags::ACTIVITY);
        self.list(&request).await
    }

    pub async fn admissions_page(&self) -> Result<Option<AdmissionsPage>, FetchError> {
        let request = FetchRequest::new("admissionsPage", queries::ADMISSIONS_PAGE)
            .tag(tags::ADMISSIONS_PAGE);
        self.fetcher.fetch(&request).await
    }

    pub async fn general_page(&self, key: GeneralPageKey) -> Result<Option<GeneralPage>, FetchError> {
        let request = FetchRequest::new("generalPage", queries::GENERAL_PAGE)
            .param("pageKey", key.as_str())
            .tag(tags::GENERAL_PAGE)
            .tag(CacheTag::new(tags::general_page(key)));
        self.fetcher.fetch(&request).await
    }

    /// Slugs of every post, program and co-op, loaded concurrently.
    pub async fn sitemap_slugs(&self) -> Result<SitemapSlugs, FetchError> {
        let posts = FetchRequest::new("postSlugs", queries::POST_SLUGS).tag(tags::POST);
        let programs = FetchRequest::new("programSlugs", queries::PROGRAM_SLUGS).tag(tags::PROGRAM);
        let coops = FetchRequest::new("coopSlugs", queries::COOP_SLUGS).tag(tags::COOP);

        let (posts, programs, coops) = futures::try_join!(
            self.list::<SlugDocument>(&posts),
            self.list::<SlugDocument>(&programs),
            self.list::<SlugDocument>(&coops),
        )?;

        Ok(SitemapSlugs {
            posts: collect_slugs(&posts),
            programs: collect_slugs(&programs),
            coops: collect_slugs(&coops),
        })
    }

    /// Lists tolerate a `null` result and dangling references.
    async fn list<T: DeserializeOwned>(&self, request: &FetchRequest) -> Result<Vec<T>, FetchError> {
        let items: Option<Vec<Option<T>>> = self.fetcher.fetch(request).await?;
        Ok(items.into_iter().flatten().flatten().collect())
    }
}

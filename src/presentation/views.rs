use crate::application::error::{ErrorReport, HttpError};
use crate::config::SiteSettings;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome.noindex(), NoticeView::not_found());
    let mut response = render_template_response(NoticeTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Error page for a failed content load. The report travels with the
/// response so the response logger can record the cause.
pub fn render_error_response(chrome: LayoutChrome, status: StatusCode, report: ErrorReport) -> Response {
    let notice = if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::BAD_GATEWAY {
        NoticeView::unavailable()
    } else {
        NoticeView::unexpected()
    };
    let view = LayoutContext::new(chrome.noindex(), notice);
    let mut response = render_template_response(NoticeTemplate { view }, status);
    report.attach(&mut response);
    response
}

/// Placeholder for a singleton document that has not been published yet.
pub fn render_unpublished_response(chrome: LayoutChrome, title: &str, message: String) -> Response {
    let notice = NoticeView {
        title: title.to_string(),
        message,
        action: None,
    };
    let view = LayoutContext::new(chrome, notice);
    render_template_response(NoticeTemplate { view }, StatusCode::OK)
}

pub const NAV_ITEMS: [(&str, &str); 6] = [
    ("About", "/about"),
    ("Programs", "/programs"),
    ("Co-op", "/coop"),
    ("Activities", "/activities"),
    ("News", "/news"),
    ("Admissions", "/admissions"),
];

#[derive(Clone)]
pub struct NavigationView {
    pub entries: Vec<LinkView>,
    pub apply: LinkView,
}

#[derive(Clone)]
pub struct FooterView {
    pub tagline: String,
    pub columns: Vec<FooterColumnView>,
    pub copy: String,
}

#[derive(Clone)]
pub struct FooterColumnView {
    pub heading: String,
    pub links: Vec<LinkView>,
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkView {
    pub label: String,
    pub href: String,
}

impl LinkView {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
        }
    }
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
    pub canonical: String,
    pub noindex: bool,
}

impl PageMetaView {
    pub fn with_canonical(self, canonical: String) -> Self {
        Self { canonical, ..self }
    }
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
}

impl LayoutChrome {
    /// Site-wide chrome with default metadata for the home page.
    pub fn for_site(site: &SiteSettings, year: i32) -> Self {
        let link = |label: &str, href: &str| LinkView::new(label, href);
        Self {
            brand: BrandView {
                title: site.name.clone(),
                href: "/".to_string(),
            },
            navigation: NavigationView {
                entries: NAV_ITEMS
                    .iter()
                    .map(|(label, href)| link(label, href))
                    .collect(),
                apply: link("Apply Now", "/admissions"),
            },
            footer: FooterView {
                tagline: "Empowering families through Christ-centered education and community."
                    .to_string(),
                columns: vec![
                    FooterColumnView {
                        heading: "About".to_string(),
                        links: vec![link("Our Mission", "/about"), link("Alumni", "/alumni")],
                    },
                    FooterColumnView {
                        heading: "Programs".to_string(),
                        links: vec![
                            link("All Programs", "/programs"),
                            link("Co-op", "/coop"),
                            link("Activities", "/activities"),
                        ],
                    },
                    FooterColumnView {
                        heading: "Connect".to_string(),
                        links: vec![
                            link("News & Events", "/news"),
                            link("FAQ", "/faq"),
                            link("Gallery", "/gallery"),
                        ],
                    },
                ],
                copy: format!("© {year} {}. All rights reserved.", site.name),
            },
            meta: PageMetaView {
                title: site.name.clone(),
                description: format!("CMS-driven website for {}.", site.name),
                canonical: site.absolute_url("/"),
                noindex: false,
            },
        }
    }

    pub fn with_canonical(self, canonical: String) -> Self {
        Self {
            meta: self.meta.with_canonical(canonical),
            ..self
        }
    }

    pub fn with_meta(self, meta: PageMetaView) -> Self {
        Self { meta, ..self }
    }

    pub fn noindex(mut self) -> Self {
        self.meta.noindex = true;
        self
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub navigation: NavigationView,
    pub footer: FooterView,
    pub meta: PageMetaView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            navigation: chrome.navigation,
            footer: chrome.footer,
            meta: chrome.meta,
            content,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
    pub width: u32,
    pub height: u32,
}

pub struct HeroView {
    pub eyebrow: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub image: Option<ImageView>,
    pub cta: Option<LinkView>,
}

pub struct PostCardView {
    pub title: String,
    pub href: String,
    pub published: String,
    pub iso_date: String,
    pub image: Option<ImageView>,
    pub categories: Vec<String>,
}

pub struct HomeView {
    pub hero: HeroView,
    pub featured: Vec<PostCardView>,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub view: LayoutContext<HomeView>,
}

pub struct NewsIndexView {
    pub posts: Vec<PostCardView>,
}

#[derive(Template)]
#[template(path = "news.html")]
pub struct NewsTemplate {
    pub view: LayoutContext<NewsIndexView>,
}

pub struct AuthorView {
    pub name: String,
    pub image: Option<ImageView>,
}

pub struct PostDetailView {
    pub title: String,
    pub categories: Vec<String>,
    pub author: Option<AuthorView>,
    pub published: String,
    pub iso_date: String,
    pub image: Option<ImageView>,
    pub body_html: Option<String>,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct ProgramCardView {
    pub title: String,
    pub title_en: Option<String>,
    pub href: String,
    pub description: Option<String>,
    pub image: Option<ImageView>,
}

pub struct ProgramsView {
    pub programs: Vec<ProgramCardView>,
}

#[derive(Template)]
#[template(path = "programs.html")]
pub struct ProgramsTemplate {
    pub view: LayoutContext<ProgramsView>,
}

pub struct ProgramDetailView {
    pub title: String,
    pub title_en: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageView>,
    pub content_html: Option<String>,
}

#[derive(Template)]
#[template(path = "program.html")]
pub struct ProgramTemplate {
    pub view: LayoutContext<ProgramDetailView>,
}

pub struct CoopCardView {
    pub title: String,
    pub href: String,
    pub day: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageView>,
}

pub struct CoopsView {
    pub coops: Vec<CoopCardView>,
}

#[derive(Template)]
#[template(path = "coops.html")]
pub struct CoopsTemplate {
    pub view: LayoutContext<CoopsView>,
}

pub struct ActivityCardView {
    pub title: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageView>,
}

pub struct AnnouncementView {
    pub title: String,
    pub href: Option<String>,
    pub published: String,
    pub iso_date: String,
}

pub struct CoopDetailView {
    pub title: String,
    pub day: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageView>,
    pub activities: Vec<ActivityCardView>,
    pub announcements: Vec<AnnouncementView>,
}

#[derive(Template)]
#[template(path = "coop.html")]
pub struct CoopTemplate {
    pub view: LayoutContext<CoopDetailView>,
}

pub struct ActivitiesView {
    pub activities: Vec<ActivityCardView>,
}

#[derive(Template)]
#[template(path = "activities.html")]
pub struct ActivitiesTemplate {
    pub view: LayoutContext<ActivitiesView>,
}

pub struct ItemView {
    pub title: String,
    pub description: Option<String>,
}

pub struct TimelineView {
    pub title: String,
    pub date_range: Option<String>,
    pub description: Option<String>,
}

pub struct AdmissionsView {
    pub hero: HeroView,
    pub overview_html: Option<String>,
    pub checklist: Vec<ItemView>,
    pub timeline: Vec<TimelineView>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

#[derive(Template)]
#[template(path = "admissions.html")]
pub struct AdmissionsTemplate {
    pub view: LayoutContext<AdmissionsView>,
}

pub struct FaqView {
    pub question: String,
    pub answer_html: Option<String>,
}

pub struct GeneralPageView {
    pub page_key: &'static str,
    pub hero: HeroView,
    pub body_html: Option<String>,
    pub highlights: Vec<ItemView>,
    pub faqs: Vec<FaqView>,
    pub gallery: Vec<GalleryImageView>,
}

pub struct GalleryImageView {
    pub image: ImageView,
    pub caption: Option<String>,
}

#[derive(Template)]
#[template(path = "general_page.html")]
pub struct GeneralPageTemplate {
    pub view: LayoutContext<GeneralPageView>,
}

pub struct NoticeView {
    pub title: String,
    pub message: String,
    pub action: Option<LinkView>,
}

impl NoticeView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist. Try returning to the homepage to continue exploring.".to_string(),
            action: Some(LinkView::new("Back to home", "/")),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            title: "Content Temporarily Unavailable".to_string(),
            message: "We could not load this page right now. Please try again in a moment."
                .to_string(),
            action: Some(LinkView::new("Back to home", "/")),
        }
    }

    pub fn unexpected() -> Self {
        Self {
            title: "Something Went Wrong".to_string(),
            message: "An unexpected error occurred while rendering this page.".to_string(),
            action: Some(LinkView::new("Back to home", "/")),
        }
    }
}

#[derive(Template)]
#[template(path = "notice.html")]
pub struct NoticeTemplate {
    pub view: LayoutContext<NoticeView>,
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::config::SiteEnvironment;

    fn chrome() -> LayoutChrome {
        let site = SiteSettings {
            base_url: Url::parse("https://jha.kr").expect("url"),
            name: "JHA (Korea)".to_string(),
            environment: SiteEnvironment::Production,
        };
        LayoutChrome::for_site(&site, 2025)
    }

    #[test]
    fn chrome_carries_the_primary_navigation() {
        let chrome = chrome();
        let labels: Vec<&str> = chrome
            .navigation
            .entries
            .iter()
            .map(|entry| entry.label.as_str())
            .collect();
        assert_eq!(
            labels,
            ["About", "Programs", "Co-op", "Activities", "News", "Admissions"]
        );
        assert_eq!(chrome.footer.copy, "© 2025 JHA (Korea). All rights reserved.");
        assert_eq!(chrome.meta.canonical, "https://jha.kr/");
    }

    #[tokio::test]
    async fn not_found_renders_layout_with_report() {
        let response = render_not_found_response(chrome());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorReport>().is_some());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let html = String::from_utf8(body.to_vec()).expect("utf8");
        assert!(html.contains("Page Not Found"));
        assert!(html.contains("href=\"/admissions\""));
        assert!(html.contains("noindex"));
    }

    #[test]
    fn unavailable_pages_keep_their_status() {
        let report = ErrorReport::from_message("test", StatusCode::SERVICE_UNAVAILABLE, "cms down");
        let response = render_error_response(chrome(), StatusCode::SERVICE_UNAVAILABLE, report);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

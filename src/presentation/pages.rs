//! Maps CMS documents onto page views and renders them.

use axum::http::StatusCode;
use axum::response::Response;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset, macros::offset};

use crate::application::error::{AppError, ErrorReport};
use crate::config::SiteSettings;
use crate::domain::content::{
    Activity, AdmissionsPage, Coop, CoopSummary, GeneralPage, GeneralPageKey, HomePage, Post,
    PostSummary, Program, ProgramSummary, SeoFields,
};
use crate::domain::image::ImageRef;
use crate::infra::sanity::{Fit, ImageUrlBuilder};

use super::portable_text::PortableTextRenderer;
use super::views::{
    ActivitiesTemplate, ActivitiesView, ActivityCardView, AdmissionsTemplate, AdmissionsView,
    AnnouncementView, AuthorView, CoopCardView, CoopDetailView, CoopTemplate, CoopsTemplate,
    CoopsView, FaqView, GalleryImageView, GeneralPageTemplate, GeneralPageView, HeroView,
    HomeTemplate, HomeView, ImageView, ItemView, LayoutChrome, LayoutContext, LinkView,
    NewsIndexView, NewsTemplate, PageMetaView, PostCardView, PostDetailView, PostTemplate,
    ProgramCardView, ProgramDetailView, ProgramTemplate, ProgramsTemplate, ProgramsView,
    TimelineView, render_error_response, render_not_found_response, render_template_response,
    render_unpublished_response,
};

/// Dates are shown in Korea Standard Time.
const DISPLAY_OFFSET: UtcOffset = offset!(+9);
pub const ADMISSIONS_CTA_LABEL: &str = "입학 지원 시작하기";
pub const ADMISSIONS_CTA_LINK: &str = "/contact";
/// Longest body excerpt used as a post's meta description.
const DESCRIPTION_MAX_CHARS: usize = 160;

pub struct PageRenderer {
    site: SiteSettings,
    images: ImageUrlBuilder,
    text: PortableTextRenderer,
}

impl PageRenderer {
    pub fn new(site: SiteSettings, images: ImageUrlBuilder) -> Self {
        let text = PortableTextRenderer::new(images.clone());
        Self { site, images, text }
    }

    pub fn site(&self) -> &SiteSettings {
        &self.site
    }

    pub fn chrome(&self) -> LayoutChrome {
        let year = OffsetDateTime::now_utc().to_offset(DISPLAY_OFFSET).year();
        LayoutChrome::for_site(&self.site, year)
    }

    /// Page metadata: CMS SEO fields first, then the page defaults.
    pub fn meta(
        &self,
        seo: Option<&SeoFields>,
        default_title: Option<&str>,
        default_description: Option<&str>,
        path: &str,
    ) -> PageMetaView {
        let title = seo
            .and_then(|seo| non_blank(seo.meta_title.as_deref()))
            .or_else(|| non_blank(default_title));
        let description = seo
            .and_then(|seo| non_blank(seo.meta_description.as_deref()))
            .or_else(|| non_blank(default_description));
        let base = self.chrome().meta;

        PageMetaView {
            title: match title {
                Some(title) if title != self.site.name => format!("{title} | {}", self.site.name),
                _ => self.site.name.clone(),
            },
            description: description.map(str::to_string).unwrap_or(base.description),
            canonical: self.site.absolute_url(path),
            noindex: seo.and_then(|seo| seo.noindex).unwrap_or(false),
        }
    }

    pub fn not_found(&self) -> Response {
        render_not_found_response(self.chrome())
    }

    /// Error page for a failed load; keeps the error's status.
    pub fn error(&self, err: AppError) -> Response {
        let status = err.status_code();
        let report = ErrorReport::from_error("presentation::pages", status, &err);
        render_error_response(self.chrome(), status, report)
    }

    pub fn home(&self, page: Option<HomePage>) -> Response {
        let Some(page) = page else {
            return render_unpublished_response(
                self.chrome(),
                &format!("{}에 오신 것을 환영합니다", self.site.name),
                "Sanity Studio에서 “Home Page” 문서를 게시해 주세요.".to_string(),
            );
        };

        let meta = self.meta(
            page.seo.as_ref(),
            Some(page.hero_title.as_str()).filter(|title| !title.is_empty()),
            page.hero_subtitle.as_deref(),
            "/",
        );
        let hero = HeroView {
            eyebrow: None,
            image: page
                .hero_image
                .as_ref()
                .and_then(|image| self.hero_image(image, &page.hero_title, 1920, 1080)),
            cta: match (non_blank(page.hero_cta_label.as_deref()), non_blank(page.hero_cta_link.as_deref())) {
                (Some(label), Some(href)) => Some(LinkView::new(label, href)),
                _ => None,
            },
            title: page.hero_title,
            subtitle: page.hero_subtitle,
        };
        let featured = self.post_cards(page.featured_news);

        let view = LayoutContext::new(self.chrome().with_meta(meta), HomeView { hero, featured });
        render_template_response(HomeTemplate { view }, StatusCode::OK)
    }

    pub fn news(&self, posts: Vec<PostSummary>) -> Response {
        let meta = self.meta(
            None,
            Some("News & Updates"),
            Some("Latest announcements, events, and stories from our community."),
            "/news",
        );
        let content = NewsIndexView {
            posts: self.post_cards(posts),
        };
        let view = LayoutContext::new(self.chrome().with_meta(meta), content);
        render_template_response(NewsTemplate { view }, StatusCode::OK)
    }

    pub fn post(&self, slug: &str, post: Option<Post>) -> Response {
        let Some(post) = post else {
            return self.not_found();
        };

        let summary = excerpt(&post.body.to_plain_text(), DESCRIPTION_MAX_CHARS);
        let categories = post.categories.join(", ");
        let meta = self.meta(
            post.seo.as_ref(),
            Some(post.title.as_str()),
            non_blank(Some(summary.as_str())).or(non_blank(Some(categories.as_str()))),
            &format!("/news/{slug}"),
        );
        let (published, iso_date) = detail_dates(post.published_at);
        let content = PostDetailView {
            image: post.main_image.as_ref().and_then(|image| {
                self.sized_image(image, &post.title, 1200, 630)
            }),
            author: post.author.and_then(|author| {
                let name = non_blank(author.name.as_deref())?.to_string();
                let image = author
                    .image
                    .as_ref()
                    .and_then(|image| self.sized_image(image, &name, 80, 80));
                Some(AuthorView { name, image })
            }),
            body_html: self.text.render(&post.body),
            title: post.title,
            categories: post.categories,
            published,
            iso_date,
        };
        let view = LayoutContext::new(self.chrome().with_meta(meta), content);
        render_template_response(PostTemplate { view }, StatusCode::OK)
    }

    pub fn programs(&self, programs: Vec<ProgramSummary>) -> Response {
        let meta = self.meta(None, Some("Programs"), None, "/programs");
        let content = ProgramsView {
            programs: programs
                .into_iter()
                .filter_map(|program| {
                    let slug = non_blank(program.slug.as_deref())?.to_string();
                    Some(ProgramCardView {
                        image: program
                            .main_image
                            .as_ref()
                            .and_then(|image| self.sized_image(image, &program.title, 600, 400)),
                        href: format!("/programs/{slug}"),
                        title: program.title,
                        title_en: program.title_en,
                        description: program.description,
                    })
                })
                .collect(),
        };
        let view = LayoutContext::new(self.chrome().with_meta(meta), content);
        render_template_response(ProgramsTemplate { view }, StatusCode::OK)
    }

    pub fn program(&self, slug: &str, program: Option<Program>) -> Response {
        let Some(program) = program else {
            return self.not_found();
        };

        let meta = self.meta(
            program.seo.as_ref(),
            Some(program.title.as_str()),
            program.description.as_deref(),
            &format!("/programs/{slug}"),
        );
        let content = ProgramDetailView {
            image: program
                .main_image
                .as_ref()
                .and_then(|image| self.hero_image(image, &program.title, 1600, 900)),
            content_html: self.text.render(&program.content),
            title: program.title,
            title_en: program.title_en,
            description: program.description,
        };
        let view = LayoutContext::new(self.chrome().with_meta(meta), content);
        render_template_response(ProgramTemplate { view }, StatusCode::OK)
    }

    pub fn coops(&self, coops: Vec<CoopSummary>) -> Response {
        let meta = self.meta(None, Some("Co-op"), None, "/coop");
        let content = CoopsView {
            coops: coops
                .into_iter()
                .filter_map(|coop| {
                    let slug = non_blank(coop.slug.as_deref())?.to_string();
                    Some(CoopCardView {
                        image: coop
                            .hero_image
                            .as_ref()
                            .and_then(|image| self.sized_image(image, &coop.title, 600, 400)),
                        href: format!("/coop/{slug}"),
                        title: coop.title,
                        day: coop.day,
                        description: coop.description,
                    })
                })
                .collect(),
        };
        let view = LayoutContext::new(self.chrome().with_meta(meta), content);
        render_template_response(CoopsTemplate { view }, StatusCode::OK)
    }

    pub fn coop(&self, slug: &str, coop: Option<Coop>) -> Response {
        let Some(coop) = coop else {
            return self.not_found();
        };

        let meta = self.meta(
            coop.seo.as_ref(),
            Some(coop.title.as_str()),
            coop.description.as_deref(),
            &format!("/coop/{slug}"),
        );
        let content = CoopDetailView {
            image: coop
                .hero_image
                .as_ref()
                .and_then(|image| self.hero_image(image, &coop.title, 1920, 960)),
            activities: self.activity_cards(coop.activities),
            announcements: coop
                .announcements
                .into_iter()
                .map(|announcement| {
                    let (published, iso_date) = card_dates(announcement.published_at);
                    AnnouncementView {
                        href: non_blank(announcement.slug.as_deref())
                            .map(|slug| format!("/news/{slug}")),
                        title: announcement.title,
                        published,
                        iso_date,
                    }
                })
                .collect(),
            title: coop.title,
            day: coop.day,
            description: coop.description,
        };
        let view = LayoutContext::new(self.chrome().with_meta(meta), content);
        render_template_response(CoopTemplate { view }, StatusCode::OK)
    }

    pub fn activities(&self, activities: Vec<Activity>) -> Response {
        let meta = self.meta(None, Some("Activities"), None, "/activities");
        let content = ActivitiesView {
            activities: self.activity_cards(activities),
        };
        let view = LayoutContext::new(self.chrome().with_meta(meta), content);
        render_template_response(ActivitiesTemplate { view }, StatusCode::OK)
    }

    pub fn admissions(&self, page: Option<AdmissionsPage>) -> Response {
        let Some(page) = page else {
            return render_unpublished_response(
                self.chrome(),
                "Admissions Information Coming Soon",
                "Publish the “Admissions Page” document in Sanity Studio to populate this page with hero, overview, checklist, and timeline content.".to_string(),
            );
        };

        let meta = self.meta(
            page.seo.as_ref(),
            Some("Admissions"),
            page.hero_subtitle.as_deref(),
            "/admissions",
        );
        let cta = LinkView::new(
            non_blank(page.cta_label.as_deref()).unwrap_or(ADMISSIONS_CTA_LABEL),
            non_blank(page.cta_link.as_deref()).unwrap_or(ADMISSIONS_CTA_LINK),
        );
        let content = AdmissionsView {
            hero: HeroView {
                eyebrow: Some("Admissions".to_string()),
                image: page
                    .hero_image
                    .as_ref()
                    .and_then(|image| self.sized_image(image, &page.hero_title, 1920, 960)),
                cta: Some(cta),
                title: page.hero_title,
                subtitle: page.hero_subtitle,
            },
            overview_html: self.text.render(&page.overview),
            checklist: page
                .checklist
                .into_iter()
                .map(|item| ItemView {
                    title: item.title.unwrap_or_default(),
                    description: item.description,
                })
                .collect(),
            timeline: page
                .timeline
                .into_iter()
                .map(|item| TimelineView {
                    title: item.title.unwrap_or_default(),
                    date_range: item.date_range,
                    description: item.description,
                })
                .collect(),
            contact_email: page.contact_email,
            contact_phone: page.contact_phone,
        };
        let view = LayoutContext::new(self.chrome().with_meta(meta), content);
        render_template_response(AdmissionsTemplate { view }, StatusCode::OK)
    }

    pub fn general_page(&self, key: GeneralPageKey, page: Option<GeneralPage>) -> Response {
        let Some(page) = page else {
            return render_unpublished_response(
                self.chrome(),
                key.fallback_title(),
                format!(
                    "Publish the “{}” document in Sanity Studio to populate this route.",
                    key.document_label()
                ),
            );
        };

        let title = if page.hero_title.is_empty() {
            key.fallback_title().to_string()
        } else {
            page.hero_title
        };
        let meta = self.meta(
            page.seo.as_ref(),
            Some(title.as_str()),
            page.hero_subtitle.as_deref(),
            key.path(),
        );
        let content = GeneralPageView {
            page_key: key.as_str(),
            hero: HeroView {
                eyebrow: None,
                image: page
                    .hero_image
                    .as_ref()
                    .and_then(|image| self.sized_image(image, &title, 1920, 960)),
                cta: None,
                title,
                subtitle: page.hero_subtitle,
            },
            body_html: self.text.render(&page.body),
            highlights: page
                .highlights
                .into_iter()
                .map(|highlight| ItemView {
                    title: highlight.title.unwrap_or_default(),
                    description: highlight.description,
                })
                .collect(),
            faqs: page
                .faq_items
                .into_iter()
                .filter_map(|faq| {
                    Some(FaqView {
                        question: non_blank(faq.question.as_deref())?.to_string(),
                        answer_html: self.text.render(&faq.answer),
                    })
                })
                .collect(),
            gallery: page
                .gallery
                .iter()
                .filter_map(|image| {
                    let fallback = image.caption.as_deref().unwrap_or("Gallery image");
                    Some(GalleryImageView {
                        image: self.sized_image(image, fallback, 800, 600)?,
                        caption: non_blank(image.caption.as_deref()).map(str::to_string),
                    })
                })
                .collect(),
        };
        let view = LayoutContext::new(self.chrome().with_meta(meta), content);
        render_template_response(GeneralPageTemplate { view }, StatusCode::OK)
    }

    fn post_cards(&self, posts: Vec<PostSummary>) -> Vec<PostCardView> {
        posts
            .into_iter()
            .filter_map(|post| {
                let slug = non_blank(post.slug.as_deref())?.to_string();
                let (published, iso_date) = card_dates(post.published_at);
                Some(PostCardView {
                    image: post
                        .main_image
                        .as_ref()
                        .and_then(|image| self.sized_image(image, &post.title, 400, 300)),
                    href: format!("/news/{slug}"),
                    title: post.title,
                    published,
                    iso_date,
                    categories: post.categories,
                })
            })
            .collect()
    }

    fn activity_cards(&self, activities: Vec<Activity>) -> Vec<ActivityCardView> {
        activities
            .into_iter()
            .map(|activity| ActivityCardView {
                image: activity
                    .featured_image
                    .as_ref()
                    .and_then(|image| self.sized_image(image, &activity.title, 600, 400)),
                title: activity.title,
                category: activity.category,
                description: activity.description,
            })
            .collect()
    }

    /// Card or inline image; alt text falls back to the document title.
    fn sized_image(&self, image: &ImageRef, fallback_alt: &str, width: u32, height: u32) -> Option<ImageView> {
        let url = self.images.image(image)?.width(width).height(height).url();
        Some(ImageView {
            url,
            alt: image.alt_text().unwrap_or(fallback_alt).to_string(),
            width,
            height,
        })
    }

    fn hero_image(&self, image: &ImageRef, fallback_alt: &str, width: u32, height: u32) -> Option<ImageView> {
        let url = self
            .images
            .image(image)?
            .width(width)
            .height(height)
            .fit(Fit::Crop)
            .quality(80)
            .url();
        Some(ImageView {
            url,
            alt: image.alt_text().unwrap_or(fallback_alt).to_string(),
            width,
            height,
        })
    }
}

/// Whitespace collapsed to single spaces, cut at `max_chars` with an ellipsis.
fn excerpt(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// `2025년 3월 1일` style, used on cards.
pub fn format_card_date(value: OffsetDateTime) -> String {
    let local = value.to_offset(DISPLAY_OFFSET);
    format!("{}년 {}월 {}일", local.year(), u8::from(local.month()), local.day())
}

/// `March 1, 2025` style, used on detail pages.
pub fn format_detail_date(value: OffsetDateTime) -> String {
    let local = value.to_offset(DISPLAY_OFFSET);
    format!("{} {}, {}", local.month(), local.day(), local.year())
}

fn card_dates(value: Option<OffsetDateTime>) -> (String, String) {
    dates(value, format_card_date)
}

fn detail_dates(value: Option<OffsetDateTime>) -> (String, String) {
    dates(value, format_detail_date)
}

fn dates(value: Option<OffsetDateTime>, display: fn(OffsetDateTime) -> String) -> (String, String) {
    match value {
        Some(value) => (display(value), value.format(&Rfc3339).unwrap_or_default()),
        None => (String::new(), String::new()),
    }
}

//! GROQ projections for every page.

pub const POSTS: &str = r#"*[_type == "post" && defined(slug.current)] | order(publishedAt desc) {
  title,
  "slug": slug.current,
  publishedAt,
  mainImage,
  "categories": categories[]->title
}"#;

/// Params: `$slug`.
pub const POST: &str = r#"*[_type == "post" && slug.current == $slug][0] {
  title,
  "slug": slug.current,
  publishedAt,
  mainImage,
  body,
  "author": author->{name, image},
  "categories": categories[]->title,
  seo
}"#;

pub const POST_SLUGS: &str = r#"*[_type == "post" && defined(slug.current)]{
  "slug": slug.current
}"#;

pub const HOME_PAGE: &str = r#"*[_type == "homePage"][0] {
  heroTitle,
  heroSubtitle,
  heroImage,
  heroCtaLabel,
  heroCtaLink,
  featuredNews[]->{
    title,
    "slug": slug.current,
    publishedAt,
    mainImage,
    "categories": categories[]->title
  },
  seo
}"#;

pub const PROGRAMS: &str = r#"*[_type == "program" && defined(slug.current)] | order(title asc) {
  title,
  titleEn,
  "slug": slug.current,
  description,
  mainImage
}"#;

/// Params: `$slug`.
pub const PROGRAM: &str = r#"*[_type == "program" && slug.current == $slug][0] {
  title,
  titleEn,
  "slug": slug.current,
  description,
  mainImage,
  content,
  seo
}"#;

pub const PROGRAM_SLUGS: &str = r#"*[_type == "program" && defined(slug.current)]{
  "slug": slug.current
}"#;

pub const ADMISSIONS_PAGE: &str = r#"*[_type == "admissionsPage" && _id == "admissionsPage"][0]{
  heroTitle,
  heroSubtitle,
  heroImage,
  ctaLabel,
  ctaLink,
  overview,
  checklist,
  timeline,
  contactEmail,
  contactPhone,
  seo
}"#;

pub const COOPS: &str = r#"*[_type == "coop" && defined(slug.current)] | order(title asc) {
  title,
  "slug": slug.current,
  day,
  description,
  heroImage
}"#;

/// Params: `$slug`.
pub const COOP: &str = r#"*[_type == "coop" && slug.current == $slug][0] {
  title,
  "slug": slug.current,
  day,
  description,
  heroImage,
  announcements[]->{
    title,
    "slug": slug.current,
    publishedAt
  },
  activities[]->{
    title,
    "slug": slug.current,
    category,
    description,
    featuredImage
  },
  seo
}"#;

pub const COOP_SLUGS: &str = r#"*[_type == "coop" && defined(slug.current)]{
  "slug": slug.current
}"#;

pub const ACTIVITIES: &str = r#"*[_type == "activity" && defined(slug.current)] | order(title asc) {
  title,
  "slug": slug.current,
  category,
  description,
  featuredImage
}"#;

/// Params: `$pageKey`.
pub const GENERAL_PAGE: &str = r#"*[_type == "generalPage" && pageKey == $pageKey][0] {
  pageKey,
  heroTitle,
  heroSubtitle,
  heroImage,
  body,
  highlights,
  faqItems[]{
    question,
    answer
  },
  gallery,
  seo
}"#;

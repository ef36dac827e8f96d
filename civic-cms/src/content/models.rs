//! Institutional content models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::lifecycle::Lifecycle;
use super::model::{
    auditable, by_publication, ensure_slug, publishable, record_accessors, Model, RecordMeta,
    LONG_SLUG_LEN, SHORT_SLUG_LEN,
};
use super::Publishable;

/// Organisational unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub head_of_department: String,
    pub email: String,
    pub phone: String,
    pub meta: RecordMeta,
}

impl Department {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

auditable!(Department, "content", "Department", name);

impl Model for Department {
    record_accessors!();

    fn prepare(&mut self) {
        ensure_slug(&mut self.slug, &self.name, SHORT_SLUG_LEN);
    }

    fn listing_order(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

/// Public service offered by a department
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: Option<i64>,
    pub department_id: i64,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub body: String,
    pub lifecycle: Lifecycle,
    pub meta: RecordMeta,
}

impl Service {
    pub fn new(department_id: i64, title: impl Into<String>) -> Self {
        Self {
            department_id,
            title: title.into(),
            ..Self::default()
        }
    }
}

auditable!(Service, "content", "Service", title);
publishable!(Service);

impl Model for Service {
    record_accessors!();

    fn prepare(&mut self) {
        ensure_slug(&mut self.slug, &self.title, SHORT_SLUG_LEN);
    }

    fn listing_order(&self, other: &Self) -> Ordering {
        (self.department_id, &self.title).cmp(&(other.department_id, &other.title))
    }
}

/// Fixed site pages, one per key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageKey {
    #[default]
    Home,
    About,
    Services,
    Departments,
    Contact,
}

impl PageKey {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::About => "About Us",
            Self::Services => "Services",
            Self::Departments => "Departments",
            Self::Contact => "Contact Us",
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Static page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: Option<i64>,
    pub key: PageKey,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub meta_title: String,
    pub meta_description: String,
    pub lifecycle: Lifecycle,
    pub meta: RecordMeta,
}

impl Page {
    pub fn new(key: PageKey, title: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
            ..Self::default()
        }
    }
}

auditable!(Page, "content", "Page", title);
publishable!(Page);

impl Model for Page {
    record_accessors!();

    fn prepare(&mut self) {
        ensure_slug(&mut self.slug, &self.title, SHORT_SLUG_LEN);
    }

    fn listing_order(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewsType {
    #[default]
    News,
    Event,
}

/// News article or event announcement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: Option<i64>,
    pub news_type: NewsType,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub body: String,
    pub cover_image_alt: String,
    /// Event window, events only
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub lifecycle: Lifecycle,
    pub meta: RecordMeta,
}

impl NewsItem {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn event(
        title: impl Into<String>,
        body: impl Into<String>,
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            news_type: NewsType::Event,
            starts_at: Some(starts_at),
            ends_at,
            ..Self::new(title, body)
        }
    }

    pub fn is_event(&self) -> bool {
        self.news_type == NewsType::Event
    }
}

auditable!(NewsItem, "content", "NewsItem", title);
publishable!(NewsItem);

impl Model for NewsItem {
    record_accessors!();

    fn prepare(&mut self) {
        ensure_slug(&mut self.slug, &self.title, LONG_SLUG_LEN);
    }

    fn listing_order(&self, other: &Self) -> Ordering {
        by_publication(
            (self.published_at(), &self.meta),
            (other.published_at(), &other.meta),
        )
    }
}

/// Vacancy announcement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CareerPosting {
    pub id: Option<i64>,
    pub department_id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub location: String,
    pub closing_date: Option<NaiveDate>,
    pub lifecycle: Lifecycle,
    pub meta: RecordMeta,
}

impl CareerPosting {
    pub fn new(
        department_id: i64,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            department_id,
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Still accepting applications on `today`
    pub fn is_open_on(&self, today: NaiveDate) -> bool {
        self.closing_date.map_or(true, |closing| today <= closing)
    }
}

auditable!(CareerPosting, "content", "CareerPosting", title);
publishable!(CareerPosting);

impl Model for CareerPosting {
    record_accessors!();

    fn prepare(&mut self) {
        ensure_slug(&mut self.slug, &self.title, LONG_SLUG_LEN);
    }

    fn listing_order(&self, other: &Self) -> Ordering {
        by_publication(
            (self.published_at(), &self.meta),
            (other.published_at(), &other.meta),
        )
    }
}

/// Site-wide settings edited from the admin
///
/// Not in the tracked set: changes here are not audited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub id: Option<i64>,
    pub site_name: String,
    pub tagline: String,
    pub logo_alt: String,
    pub address: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub facebook_url: String,
    pub twitter_url: String,
    pub meta: RecordMeta,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            id: None,
            site_name: "Government Institution".to_string(),
            tagline: String::new(),
            logo_alt: String::new(),
            address: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            facebook_url: String::new(),
            twitter_url: String::new(),
            meta: RecordMeta::default(),
        }
    }
}

impl crate::audit::Auditable for SiteSettings {
    const ENTITY_TYPE: crate::audit::EntityType =
        crate::audit::EntityType::new("content", "SiteSettings");

    fn audit_id(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    fn audit_repr(&self) -> Result<String, crate::audit::ReprError> {
        Ok("Site Settings".to_string())
    }
}

impl Model for SiteSettings {
    record_accessors!();
}

//! Folds the directory of stored alerts into one Atom feed.

use std::fs;

use tracing::debug;

use crate::alert::{self, Alert};
use crate::atom::{self, Category, Entry, Feed, Generator, Geocode, Link, Person, Text};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::{Kind, Store};
use crate::types::TimeStr;

/// Build a feed covering every alert currently in the store.
///
/// Files are visited in filename order so a fixed directory snapshot always
/// yields the same feed; subdirectories are skipped. A single unreadable or
/// unparseable alert fails the whole run, so a partial feed is never
/// produced. An empty directory yields a feed with zero entries.
pub fn build_feed(store: &Store, config: &Config, updated: TimeStr) -> Result<Feed> {
    let mut names = Vec::new();
    for dir_entry in fs::read_dir(store.dir(Kind::Alerts))? {
        let dir_entry = dir_entry?;
        if dir_entry.file_type()?.is_dir() {
            continue;
        }
        names.push(dir_entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    let mut entries = Vec::with_capacity(names.len());
    for name in &names {
        let data = store.retrieve(Kind::Alerts, name)?;
        let alert = alert::parse_alert(&data)?;
        entries.push(project(&alert, name, config)?);
    }
    debug!(entries = entries.len(), "aggregated alert directory");

    Ok(Feed {
        xmlns: atom::ATOM_NS.to_string(),
        id: format!("{}cap/", config.host_name),
        title: Text::plain(config.feed_title.as_str()),
        updated,
        author: vec![Person {
            name: config.feed_author.clone(),
            ..Default::default()
        }],
        link: vec![Link {
            href: format!("{}cap/", config.host_name),
            ..Default::default()
        }],
        generator: Generator {
            content: "capstan CAP Server".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            ..Default::default()
        },
        logo: config.feed_logo.clone(),
        entries,
        ..Default::default()
    })
}

/// Project one alert into one feed entry.
///
/// Only the first info block is represented; the feed schema carries a
/// single set of extension fields per entry, and later blocks are dropped.
fn project(alert: &Alert, filename: &str, config: &Config) -> Result<Entry> {
    let info = alert.info.first().ok_or_else(|| {
        Error::validation(format!("alert {} has no info block", alert.identifier))
    })?;

    let categories = info
        .category
        .iter()
        .map(|code| Category {
            content: code.clone(),
            ..Default::default()
        })
        .collect();

    let mut area_desc = String::new();
    let mut polygons = Vec::new();
    let mut circles = Vec::new();
    let mut geocode = Geocode::default();
    for area in &info.area {
        // Every description gets the "; " separator, the first one included;
        // published feeds have always carried the leading separator.
        area_desc.push_str("; ");
        area_desc.push_str(&area.area_desc);
        polygons.extend(area.polygon.iter().cloned());
        circles.extend(area.circle.iter().cloned());
        for code in &area.geocode {
            geocode.push(code.name.as_str(), code.value.as_str());
        }
    }

    Ok(Entry {
        id: alert.identifier.clone(),
        title: Text::plain(info.headline.as_str()),
        updated: alert.sent.clone(),
        author: vec![Person {
            name: alert.sender.clone(),
            ..Default::default()
        }],
        link: vec![Link {
            href: format!("{}alerts/{}", config.host_name, filename),
            ..Default::default()
        }],
        summary: Text::plain(info.description.as_str()),
        category: categories,
        published: alert.sent.clone(),
        event: info.event.clone(),
        effective: info.effective.clone(),
        expires: info.expires.clone(),
        status: alert.status.clone(),
        msg_type: alert.msg_type.clone(),
        urgency: info.urgency.clone(),
        severity: info.severity.clone(),
        certainty: info.certainty.clone(),
        area_desc,
        polygon: polygons,
        circle: circles,
        geocode,
        ..Default::default()
    })
}

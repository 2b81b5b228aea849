//! Chart-ready reshaping of a snapshot
//!
//! Everything here is pure: a snapshot (or slices of it) goes in, a
//! serializable chart description comes out. Stored timestamps are shifted
//! by a fixed offset before they are shown.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::models::{Entity, EntityType, Group, Metric, Post};
use crate::snapshot::Snapshot;

const TITLE_WRAP_MIN_CHARS: usize = 80;
const TITLE_WRAP_POINTS: [usize; 3] = [60, 120, 180];
const SLIDER_MARKS: i32 = 6;
const FONT_SCALE: f64 = 80.0;
const TOP_WORDS: usize = 25;
// Spiral center: middle of the cloud's axis ranges
const CLOUD_CENTER: (f64, f64) = (75.0, 175.0);
const CLOUD_X_RANGE: [f64; 2] = [-100.0, 250.0];
const CLOUD_Y_RANGE: [f64; 2] = [-100.0, 450.0];
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
const SPIRAL_SPACING: f64 = 14.0;

/// Converts between stored and displayed timestamps
#[derive(Debug, Clone, Copy)]
pub struct DisplayClock {
    offset: Duration,
}

impl DisplayClock {
    #[must_use]
    pub fn new(offset_hours: i64) -> Self {
        Self {
            offset: Duration::hours(offset_hours),
        }
    }

    #[must_use]
    pub fn to_display(self, stored: NaiveDateTime) -> NaiveDateTime {
        stored.checked_add_signed(self.offset).unwrap_or(stored)
    }

    #[must_use]
    pub fn to_stored(self, displayed: NaiveDateTime) -> NaiveDateTime {
        displayed.checked_sub_signed(self.offset).unwrap_or(displayed)
    }

    /// Epoch seconds of a displayed time, read as UTC
    #[must_use]
    pub fn epoch(displayed: NaiveDateTime) -> i64 {
        displayed.and_utc().timestamp()
    }

    /// Displayed time for epoch seconds, read as UTC
    #[must_use]
    pub fn from_epoch(secs: i64) -> Option<NaiveDateTime> {
        chrono::DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
    }
}

/// Look up a group by display name
#[must_use]
pub fn group_by_name<'a>(snapshot: &'a Snapshot, name: &str) -> Option<&'a Group> {
    snapshot.groups.iter().find(|group| group.name == name)
}

/// Posts of `group`, newest first
#[must_use]
pub fn group_posts<'a>(snapshot: &'a Snapshot, group: &Group) -> Vec<&'a Post> {
    snapshot
        .posts
        .iter()
        .filter(|post| post.group == group.screen_name)
        .collect()
}

/// Insert `<br>` breaks into long titles.
///
/// Titles shorter than 80 characters are returned unchanged. Otherwise the
/// first space at or after characters 60, 120 and 180 becomes a break.
#[must_use]
pub fn wrap_title(title: &str) -> String {
    if title.chars().count() < TITLE_WRAP_MIN_CHARS {
        return title.to_string();
    }

    let mut wrapped = String::with_capacity(title.len() + 12);
    let mut points = TITLE_WRAP_POINTS.iter().peekable();
    for (index, ch) in title.chars().enumerate() {
        if ch == ' ' && points.peek().is_some_and(|&&point| index >= point) {
            wrapped.push_str("<br>");
            // A late break can cover several points at once
            while points.peek().is_some_and(|&&point| index >= point) {
                points.next();
            }
        } else {
            wrapped.push(ch);
        }
    }
    wrapped
}

/// Time series of one engagement counter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    /// Charted counter
    pub metric: Metric,
    /// Display dates
    pub x: Vec<NaiveDateTime>,
    /// Counter values, aligned with `x`
    pub y: Vec<i64>,
    /// Wrapped title, date and all four counters per point
    pub hover_text: Vec<String>,
    /// Visible window: the last day before `now`
    pub x_range: [NaiveDateTime; 2],
    /// Set when there are no posts to chart
    pub insufficient_data: bool,
}

/// Build the series of `metric` over `posts`
#[must_use]
pub fn line_chart(
    posts: &[&Post],
    metric: Metric,
    now: NaiveDateTime,
    clock: DisplayClock,
) -> LineChart {
    let shown_now = clock.to_display(now);
    let x = posts.iter().map(|post| clock.to_display(post.date)).collect();
    let y = posts.iter().map(|post| post.metric(metric)).collect();
    let hover_text = posts.iter().map(|post| hover_text(post, clock)).collect();

    LineChart {
        metric,
        x,
        y,
        hover_text,
        x_range: [shown_now - Duration::days(1), shown_now],
        insufficient_data: posts.is_empty(),
    }
}

fn hover_text(post: &Post, clock: DisplayClock) -> String {
    format!(
        "<b>{}</b><br><br>Date: {}<br>Likes: {}<br>Comments: {}<br>Views: {}<br>Reposts: {}",
        wrap_title(&post.title),
        clock.to_display(post.date),
        post.likes_count,
        post.comments_count,
        post.views_count,
        post.reposts_count,
    )
}

/// Headline numbers for one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupInfo {
    /// Display name
    pub name: String,
    /// External key
    pub screen_name: String,
    /// Subscriber count
    pub members_count: i64,
    /// Posts in the snapshot
    pub post_count: usize,
    /// Integer means; `None` when the group has no posts
    pub avg_views: Option<i64>,
    /// Mean likes
    pub avg_likes: Option<i64>,
    /// Mean comments
    pub avg_comments: Option<i64>,
    /// Mean reposts
    pub avg_reposts: Option<i64>,
}

#[must_use]
pub fn group_info(snapshot: &Snapshot, group: &Group) -> GroupInfo {
    let posts = group_posts(snapshot, group);
    let mean = |metric: Metric| {
        let count = i64::try_from(posts.len()).ok().filter(|&n| n > 0)?;
        let total: i64 = posts.iter().map(|post| post.metric(metric)).sum();
        Some(total / count)
    };

    GroupInfo {
        name: group.name.clone(),
        screen_name: group.screen_name.clone(),
        members_count: group.members_count,
        post_count: posts.len(),
        avg_views: mean(Metric::Views),
        avg_likes: mean(Metric::Likes),
        avg_comments: mean(Metric::Comments),
        avg_reposts: mean(Metric::Reposts),
    }
}

/// Link to a post on its group's wall
#[must_use]
pub fn post_href(screen_name: &str, group_id: i64, post_id: i64) -> String {
    format!("https://vk.com/{screen_name}?w=wall-{group_id}_{post_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsRow {
    /// Post title
    pub title: String,
    /// Link to the post on VK
    pub href: String,
    /// Group name and display date, newline separated
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsTable {
    /// Display time of the build, `HH:MM:SS`
    pub last_updated: String,
    /// Newest posts first
    pub rows: Vec<NewsRow>,
}

/// Newest posts across all groups.
///
/// Posts whose group is missing from the snapshot are skipped.
#[must_use]
pub fn news_table(
    snapshot: &Snapshot,
    now: NaiveDateTime,
    max_rows: usize,
    clock: DisplayClock,
) -> NewsTable {
    let groups: HashMap<&str, &Group> = snapshot
        .groups
        .iter()
        .map(|group| (group.screen_name.as_str(), group))
        .collect();

    let rows = snapshot
        .posts
        .iter()
        .filter_map(|post| {
            let group = groups.get(post.group.as_str())?;
            Some(NewsRow {
                title: post.title.clone(),
                href: post_href(&group.screen_name, group.group_id, post.post_id),
                tooltip: format!("{}\n{}", group.name, clock.to_display(post.date)),
            })
        })
        .take(max_rows)
        .collect();

    NewsTable {
        last_updated: clock.to_display(now).format("%H:%M:%S").to_string(),
        rows,
    }
}

/// Date-range selector over a group's posts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSlider {
    /// Epoch seconds to `%d-%m-%Y` labels
    pub marks: BTreeMap<i64, String>,
    /// Epoch seconds of the earliest post
    pub min: i64,
    /// Epoch seconds of the newest post
    pub max: i64,
    /// Slider granularity in seconds
    pub step: f64,
    /// Initially selected range
    pub value: [i64; 2],
}

/// Build the slider for `posts`; `None` when there are no posts
#[must_use]
pub fn time_slider(posts: &[&Post], clock: DisplayClock) -> Option<TimeSlider> {
    let first = posts.iter().map(|post| post.date).min()?;
    let last = posts.iter().map(|post| post.date).max()?;
    let (first, last) = (clock.to_display(first), clock.to_display(last));

    let delta = (last - first) / SLIDER_MARKS;
    let marks: BTreeMap<i64, String> = (0..SLIDER_MARKS)
        .map(|i| {
            let at = first + delta * i;
            (DisplayClock::epoch(at), at.format("%d-%m-%Y").to_string())
        })
        .collect();

    let min = DisplayClock::epoch(first);
    let max = DisplayClock::epoch(last);
    // Marks collapse to one key when all posts share a timestamp
    let step = (max - min) as f64 / (f64::from(SLIDER_MARKS) * 3.0);

    Some(TimeSlider {
        marks,
        min,
        max,
        step,
        value: [min, max],
    })
}

/// Entities of `group`'s posts dated within `[start, end]` (stored time)
#[must_use]
pub fn filter_entities<'a>(
    snapshot: &'a Snapshot,
    group: &Group,
    type_filter: Option<EntityType>,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<&'a Entity> {
    let post_ids: HashSet<i64> = group_posts(snapshot, group)
        .into_iter()
        .map(|post| post.post_id)
        .collect();

    snapshot
        .entities
        .iter()
        .filter(|entity| post_ids.contains(&entity.post_id))
        .filter(|entity| !matches!(type_filter, Some(t) if t != entity.entity_type))
        .filter(|entity| entity.date >= start && entity.date <= end)
        .collect()
}

/// One positioned word of the cloud
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudWord {
    /// The word
    pub text: String,
    /// Occurrences
    pub count: usize,
    /// Relative to the most frequent word
    pub frequency: f64,
    /// `frequency * 80`
    pub font_size: f64,
    /// Spiral x position
    pub x: f64,
    /// Spiral y position
    pub y: f64,
    /// Word and relative frequency
    pub hover_text: String,
}

/// Horizontal bar chart of the top words, least frequent first
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct BarChart {
    /// Words, least frequent first
    pub y: Vec<String>,
    /// Frequencies, aligned with `y`
    pub x: Vec<f64>,
}

/// Treemap of the top words
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Treemap {
    /// Words
    pub labels: Vec<String>,
    /// Parent labels (all empty)
    pub parents: Vec<String>,
    /// Frequencies, aligned with `labels`
    pub values: Vec<f64>,
}

/// Entity word cloud with its bar and treemap companions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCloud {
    /// Placed words, most frequent first
    pub words: Vec<CloudWord>,
    /// Fixed x-axis range
    pub x_range: [f64; 2],
    /// Fixed y-axis range
    pub y_range: [f64; 2],
    /// Top words as a horizontal bar chart
    pub bar: BarChart,
    /// Top words as a treemap
    pub treemap: Treemap,
    /// Set when no word survives filtering
    pub insufficient_data: bool,
}

/// Word frequencies over entity texts, laid out for a cloud
#[must_use]
pub fn word_cloud(entities: &[&Entity], stopwords: &[String], max_words: usize) -> WordCloud {
    let stopwords: HashSet<String> = stopwords.iter().map(|w| w.to_lowercase()).collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entity in entities {
        for word in entity.text.split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            if word.chars().count() < 2 || stopwords.contains(&word.to_lowercase()) {
                continue;
            }
            *counts.entry(word).or_default() += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(max_words);

    let top_count = ranked.first().map_or(1, |&(_, count)| count) as f64;
    let words: Vec<CloudWord> = ranked
        .into_iter()
        .enumerate()
        .map(|(index, (text, count))| {
            let frequency = count as f64 / top_count;
            let (x, y) = spiral_position(index);
            CloudWord {
                text: text.to_string(),
                count,
                frequency,
                font_size: frequency * FONT_SCALE,
                x,
                y,
                hover_text: format!("{text} - {frequency}"),
            }
        })
        // Ranked by frequency, so this cuts a tail
        .take_while(|word| word.font_size > 1.0)
        .collect();

    let mut top: Vec<&CloudWord> = words.iter().take(TOP_WORDS).collect();
    top.reverse();
    let bar = BarChart {
        y: top.iter().map(|w| w.text.clone()).collect(),
        x: top.iter().map(|w| w.frequency).collect(),
    };
    let treemap = Treemap {
        labels: bar.y.clone(),
        parents: vec![String::new(); top.len()],
        values: bar.x.clone(),
    };

    WordCloud {
        insufficient_data: words.is_empty(),
        words,
        x_range: CLOUD_X_RANGE,
        y_range: CLOUD_Y_RANGE,
        bar,
        treemap,
    }
}

fn spiral_position(index: usize) -> (f64, f64) {
    let step = index as f64;
    let radius = SPIRAL_SPACING * step.sqrt();
    let angle = step * GOLDEN_ANGLE;
    (
        CLOUD_CENTER.0 + radius * angle.cos(),
        CLOUD_CENTER.1 + radius * angle.sin(),
    )
}

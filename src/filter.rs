//! Client-side filtering and pagination of the channel list

use crate::models::Channel;

pub const PAGE_SIZE: usize = 20;
pub const ALL: &str = "All";

/// Search, facet selection and current page. Pages are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    search: String,
    category: String,
    country: String,
    page: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: ALL.to_string(),
            country: ALL.to_string(),
            page: 1,
        }
    }
}

impl FilterState {
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        let search = search.into();
        if search != self.search {
            self.search = search;
            self.page = 1;
        }
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        let category = category.into();
        if category != self.category {
            self.category = category;
            self.page = 1;
        }
    }

    pub fn set_country(&mut self, country: impl Into<String>) {
        let country = country.into();
        if country != self.country {
            self.country = country;
            self.page = 1;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn has_active_filters(&self) -> bool {
        !self.search.is_empty() || self.category != ALL || self.country != ALL
    }

    pub fn matches(&self, channel: &Channel) -> bool {
        let matches_search = self.search.is_empty()
            || channel
                .name
                .to_lowercase()
                .contains(&self.search.to_lowercase());
        let matches_category =
            self.category == ALL || channel.category.as_deref() == Some(self.category.as_str());
        let matches_country =
            self.country == ALL || channel.country.as_deref() == Some(self.country.as_str());

        matches_search && matches_category && matches_country
    }

    pub fn next_page(&mut self, total_pages: usize) {
        self.page = (self.page + 1).min(total_pages.max(1));
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    /// Filter `channels` and cut out the current page, clamping the stored page
    /// when the list shrank underneath it.
    pub fn view<'a>(&mut self, channels: &'a [Channel]) -> PageView<'a> {
        let filtered = filter_channels(channels, self);
        let total = total_pages(filtered.len());
        self.page = self.page.clamp(1, total);
        PageView::new(filtered, self.page)
    }
}

pub fn filter_channels<'a>(channels: &'a [Channel], state: &FilterState) -> Vec<&'a Channel> {
    channels.iter().filter(|c| state.matches(c)).collect()
}

/// `max(1, ceil(count / PAGE_SIZE))`
pub fn total_pages(count: usize) -> usize {
    count.div_ceil(PAGE_SIZE).max(1)
}

/// Sidebar facet narrowing: case-insensitive substring on the label.
pub fn narrow_facets<'a>(
    items: &'a [String],
    query: &str,
    label: impl Fn(&str) -> String,
) -> Vec<&'a String> {
    let query = query.to_lowercase();
    items
        .iter()
        .filter(|item| label(item.as_str()).to_lowercase().contains(&query))
        .collect()
}

pub fn narrow_categories<'a>(categories: &'a [String], query: &str) -> Vec<&'a String> {
    narrow_facets(categories, query, |c| c.to_string())
}

/// Countries match on their display name, not the code.
pub fn narrow_countries<'a>(countries: &'a [String], query: &str) -> Vec<&'a String> {
    narrow_facets(countries, query, crate::country::country_name)
}

/// One page of filtered channels.
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    pub items: Vec<&'a Channel>,
    pub page: usize,
    pub total_pages: usize,
    pub total_filtered: usize,
}

impl<'a> PageView<'a> {
    pub fn new(filtered: Vec<&'a Channel>, page: usize) -> Self {
        let total_filtered = filtered.len();
        let total_pages = total_pages(total_filtered);
        let page = page.clamp(1, total_pages);
        let items = filtered
            .into_iter()
            .skip((page - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect();
        Self {
            items,
            page,
            total_pages,
            total_filtered,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChannelId;
    use pretty_assertions::assert_eq;

    fn channel(id: i64, name: &str, category: &str, country: &str) -> Channel {
        Channel {
            id: ChannelId::from(id),
            name: name.to_string(),
            logo: None,
            category: Some(category.to_string()),
            country: Some(country.to_string()),
            language: None,
            channel_url: format!("http://streams.test/{}.m3u8", id),
        }
    }

    fn sample() -> Vec<Channel> {
        vec![
            channel(1, "CNN International", "News", "US"),
            channel(2, "BBC News", "News", "UK"),
            channel(3, "ESPN", "Sports", "US"),
            channel(4, "Cartoon Network", "Kids", "US"),
            channel(5, "Sky Sports News", "Sports", "UK"),
        ]
    }

    fn numbered(count: usize) -> Vec<Channel> {
        (0..count)
            .map(|i| channel(i as i64, &format!("Channel {}", i), "News", "US"))
            .collect()
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let channels = sample();
        let mut state = FilterState::default();
        state.set_search("news");
        let names: Vec<&str> = filter_channels(&channels, &state)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["BBC News", "Sky Sports News"]);
    }

    #[test]
    fn test_category_and_country() {
        let channels = sample();
        let mut state = FilterState::default();
        state.set_category("Sports");
        state.set_country("UK");
        let filtered = filter_channels(&channels, &state);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, ChannelId::from(5));
    }

    #[test]
    fn test_missing_fields_only_match_all() {
        let mut bare = channel(9, "Unknown", "", "");
        bare.category = None;
        bare.country = None;
        let channels = vec![bare];

        let mut state = FilterState::default();
        assert_eq!(filter_channels(&channels, &state).len(), 1);
        state.set_category("News");
        assert!(filter_channels(&channels, &state).is_empty());
    }

    #[test]
    fn test_adding_constraints_never_grows_result() {
        let channels = sample();
        let mut state = FilterState::default();
        let mut previous = filter_channels(&channels, &state).len();

        state.set_search("n");
        let next = filter_channels(&channels, &state).len();
        assert!(next <= previous);
        previous = next;

        state.set_category("News");
        let next = filter_channels(&channels, &state).len();
        assert!(next <= previous);
        previous = next;

        state.set_country("US");
        let next = filter_channels(&channels, &state).len();
        assert!(next <= previous);
        assert_eq!(next, 1);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0), 1);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(20), 1);
        assert_eq!(total_pages(21), 2);
        assert_eq!(total_pages(45), 3);
    }

    #[test]
    fn test_page_navigation_bounds() {
        let channels = numbered(45);
        let mut state = FilterState::default();

        let view = state.view(&channels);
        assert_eq!(view.items.len(), 20);
        assert!(!view.has_prev());
        assert!(view.has_next());

        state.next_page(view.total_pages);
        state.next_page(view.total_pages);
        state.next_page(view.total_pages);
        let view = state.view(&channels);
        assert_eq!(view.page, 3);
        assert_eq!(view.items.len(), 5);
        assert!(view.has_prev());
        assert!(!view.has_next());

        state.prev_page();
        state.prev_page();
        state.prev_page();
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let channels = numbered(45);
        let mut state = FilterState::default();
        state.next_page(3);
        assert_eq!(state.page(), 2);

        state.set_search("Channel");
        assert_eq!(state.page(), 1);

        state.next_page(3);
        state.set_search("Channel");
        assert_eq!(state.page(), 2, "same value keeps the page");

        assert_eq!(state.view(&channels).page, 2);
        state.set_country("DE");
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn test_page_clamped_when_list_shrinks() {
        let mut state = FilterState::default();
        state.next_page(3);
        state.next_page(3);
        let five = numbered(5);
        let view = state.view(&five);
        assert_eq!(view.page, 1);
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn test_clear_and_active_filters() {
        let mut state = FilterState::default();
        assert!(!state.has_active_filters());
        state.set_category("News");
        assert!(state.has_active_filters());
        state.clear();
        assert_eq!(state, FilterState::default());
    }

    #[test]
    fn test_narrow_facets() {
        let categories: Vec<String> = ["All", "Kids", "News", "Sports"].iter().map(|s| s.to_string()).collect();
        let hits: Vec<&str> = narrow_categories(&categories, "S").iter().map(|s| s.as_str()).collect();
        assert_eq!(hits, vec!["Kids", "News", "Sports"]);
        let hits: Vec<&str> = narrow_categories(&categories, "sPo").iter().map(|s| s.as_str()).collect();
        assert_eq!(hits, vec!["Sports"]);
        assert_eq!(narrow_categories(&categories, "").len(), 4);

        let countries: Vec<String> = ["DE", "UK", "US"].iter().map(|s| s.to_string()).collect();
        let hits: Vec<&str> = narrow_countries(&countries, "united").iter().map(|s| s.as_str()).collect();
        assert_eq!(hits, vec!["UK", "US"]);
        assert!(narrow_countries(&countries, "us").is_empty());
    }

    #[test]
    fn test_empty_result_single_page() {
        let channels = sample();
        let mut state = FilterState::default();
        state.set_search("zzz");
        let view = state.view(&channels);
        assert_eq!(view.total_filtered, 0);
        assert_eq!(view.total_pages, 1);
        assert!(!view.has_prev() && !view.has_next());
    }
}

use chain_base::ChainResult;

use crate::document::PageMeta;
use crate::entity::{EntityKind, Filter};
use crate::link::{Link, LinkBuilder};

/// Where a collection request wants to start, and how it was filtered.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContext {
    pub kind: EntityKind,
    pub filter: Filter,
    pub offset: usize,
}

/// One page of a collection plus the links to its neighbours.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub meta: PageMeta,
}

/* 📖 # Why clamp the previous link?

A client can ask for any offset, including one past the end. Pointing its
`previous` link at the start of the last real page means following it always
lands on data instead of another empty page. Offsets never go below zero.
*/

/// Splits a collection into fixed-size pages.
#[derive(Debug, Clone)]
pub struct Paginator<'a> {
    links: &'a LinkBuilder,
    page_size: usize,
}

impl<'a> Paginator<'a> {
    /// `page_size` must be positive; configuration enforces this.
    pub fn new(links: &'a LinkBuilder, page_size: usize) -> Self {
        Self {
            links,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Take the page starting at `context.offset` out of the filtered member
    /// list. `total_count` is the number of matches the store reported and
    /// decides the next/previous links even when the store handed over fewer
    /// entities. Next/previous links keep the filter.
    pub fn paginate<T>(
        &self,
        entities: Vec<T>,
        total_count: usize,
        context: &PageContext,
    ) -> ChainResult<Page<T>> {
        let offset = context.offset;
        let items: Vec<T> = entities
            .into_iter()
            .skip(offset)
            .take(self.page_size)
            .collect();

        let next = if offset.saturating_add(self.page_size) < total_count {
            Some(self.link(context, offset + self.page_size)?)
        } else {
            None
        };
        let previous = if offset > 0 {
            let last_page = self.last_page_offset(total_count);
            let target = offset.saturating_sub(self.page_size).min(last_page);
            Some(self.link(context, target)?)
        } else {
            None
        };

        Ok(Page {
            items,
            total_count,
            meta: PageMeta {
                page_size: self.page_size,
                offset,
                next,
                previous,
            },
        })
    }

    fn last_page_offset(&self, total_count: usize) -> usize {
        if total_count == 0 {
            0
        } else {
            (total_count - 1) / self.page_size * self.page_size
        }
    }

    fn link(&self, context: &PageContext, offset: usize) -> ChainResult<Link> {
        Link::new(
            self.links
                .collection_href(context.kind, &context.filter, offset),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{Curie, CurieRegistry};

    fn links() -> LinkBuilder {
        LinkBuilder::new(
            "http://localhost",
            CurieRegistry::new(Curie {
                name: "ch".to_string(),
                template: "http://localhost/rels/{rel}".to_string(),
            }),
        )
    }

    fn context(offset: usize) -> PageContext {
        PageContext {
            kind: EntityKind::Sensor,
            filter: Filter::new(),
            offset,
        }
    }

    fn hrefs(page: &Page<u32>) -> (Option<&str>, Option<&str>) {
        (
            page.meta.previous.as_ref().map(Link::href),
            page.meta.next.as_ref().map(Link::href),
        )
    }

    #[test]
    fn test_first_page_has_only_next() {
        let links = links();
        let page = Paginator::new(&links, 10)
            .paginate((0..25).collect::<Vec<u32>>(), 25, &context(0))
            .unwrap();
        assert_eq!(page.items, (0..10).collect::<Vec<u32>>());
        assert_eq!(page.total_count, 25);
        assert_eq!(
            hrefs(&page),
            (None, Some("http://localhost/api/sensors/?offset=10"))
        );
    }

    #[test]
    fn test_middle_page_links_both_ways_and_drops_zero_offset() {
        let links = links();
        let page = Paginator::new(&links, 10)
            .paginate((0..25).collect::<Vec<u32>>(), 25, &context(10))
            .unwrap();
        assert_eq!(page.items.first(), Some(&10));
        assert_eq!(
            hrefs(&page),
            (
                Some("http://localhost/api/sensors/"),
                Some("http://localhost/api/sensors/?offset=20")
            )
        );
    }

    #[test]
    fn test_last_page_has_only_previous() {
        let links = links();
        let page = Paginator::new(&links, 10)
            .paginate((0..25).collect::<Vec<u32>>(), 25, &context(20))
            .unwrap();
        assert_eq!(page.items, (20..25).collect::<Vec<u32>>());
        assert_eq!(
            hrefs(&page),
            (Some("http://localhost/api/sensors/?offset=10"), None)
        );
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_page() {
        let links = links();
        let page = Paginator::new(&links, 10)
            .paginate((0..20).collect::<Vec<u32>>(), 20, &context(10))
            .unwrap();
        assert_eq!(page.items.len(), 10);
        assert!(page.meta.next.is_none());
    }

    #[test]
    fn test_offset_past_end_clamps_previous_to_last_page() {
        let links = links();
        let page = Paginator::new(&links, 10)
            .paginate((0..25).collect::<Vec<u32>>(), 25, &context(95))
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(
            hrefs(&page),
            (Some("http://localhost/api/sensors/?offset=20"), None)
        );
    }

    #[test]
    fn test_small_offset_saturates_at_zero() {
        let links = links();
        let page = Paginator::new(&links, 10)
            .paginate((0..25).collect::<Vec<u32>>(), 25, &context(3))
            .unwrap();
        assert_eq!(page.items.first(), Some(&3));
        assert_eq!(hrefs(&page).0, Some("http://localhost/api/sensors/"));
    }

    #[test]
    fn test_empty_collection_has_no_links() {
        let links = links();
        let page = Paginator::new(&links, 10)
            .paginate(Vec::<u32>::new(), 0, &context(0))
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(hrefs(&page), (None, None));
    }

    #[test]
    fn test_links_keep_filter() {
        let links = links();
        let context = PageContext {
            kind: EntityKind::ScalarData,
            filter: Filter::new().with("sensor", "4"),
            offset: 0,
        };
        let page = Paginator::new(&links, 2)
            .paginate(vec![1u32, 2, 3], 3, &context)
            .unwrap();
        assert_eq!(
            hrefs(&page).1,
            Some("http://localhost/api/scalar_data/?sensor=4&offset=2")
        );
    }

    #[test]
    fn test_walking_next_links_visits_every_page() {
        let links = links();
        let paginator = Paginator::new(&links, 7);
        let mut offset = 0;
        let mut pages = 0;
        let mut seen = vec![];
        loop {
            let page = paginator
                .paginate((0..50).collect::<Vec<u32>>(), 50, &context(offset))
                .unwrap();
            pages += 1;
            seen.extend(page.items);
            match page.meta.next {
                Some(_) => offset += 7,
                None => break,
            }
        }
        assert_eq!(pages, 50usize.div_ceil(7));
        assert_eq!(seen, (0..50).collect::<Vec<u32>>());
    }

    #[test]
    fn test_reported_total_decides_links() {
        let links = links();
        let page = Paginator::new(&links, 2)
            .paginate(vec![1u32, 2], 20, &context(0))
            .unwrap();
        assert_eq!(page.total_count, 20);
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(
            hrefs(&page),
            (None, Some("http://localhost/api/sensors/?offset=2"))
        );

        let page = Paginator::new(&links, 2)
            .paginate(vec![1u32, 2], 20, &context(30))
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(
            hrefs(&page),
            (Some("http://localhost/api/sensors/?offset=18"), None)
        );
    }
}

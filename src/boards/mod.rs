//! Board profiles: everything that is specific to one job board.
//!
//! A profile owns the board's query vocabulary (generic filter keys map to
//! different parameter names per board), its fetch mode, its listing and
//! skeleton locators, and the assembly of a normalized record from a detail
//! page. Nothing outside this module knows any board-specific selector.

pub mod indeed;
pub mod linkedin;

use crate::fetch::FetchMode;
use crate::model::{Board, FilterSet, JobRecord, ListingRef};
use scraper::Html;

pub use indeed::Indeed;
pub use linkedin::LinkedIn;

/// Board-specific behavior behind one seam.
pub trait BoardProfile: Send + Sync {
    fn board(&self) -> Board;

    /// Transport the board's pages require.
    fn mode(&self) -> FetchMode;

    /// Board-specific search URL for one page of results. Filter keys whose
    /// value is absent are omitted entirely.
    fn search_url(&self, filters: &FilterSet, page: usize) -> String;

    /// URL fetched to resolve one identifier to a detail document.
    fn detail_url(&self, id: &str) -> String;

    /// Listing references present on a results page, in document order.
    fn listing_refs(&self, doc: &Html) -> Vec<ListingRef>;

    /// Whether the expected page structure is present at all. A page with
    /// zero listings but an intact skeleton is a valid empty page; a page
    /// with the skeleton entirely absent is treated as blocked.
    fn page_intact(&self, doc: &Html) -> bool;

    /// Whether a detail document carries the board's expected structure.
    /// Challenge and auth-wall bodies arrive with a success status, so an
    /// absent skeleton is read as blocked rather than resolved empty.
    fn detail_intact(&self, doc: &Html) -> bool;

    /// Assemble a normalized record from a detail document. Every field is
    /// extracted independently; misses keep their sentinel.
    fn build_record(&self, r: &ListingRef, doc: &Html) -> JobRecord;
}

/// Static profile instance for a board.
pub fn profile_for(board: Board) -> &'static dyn BoardProfile {
    match board {
        Board::Indeed => &Indeed,
        Board::LinkedIn => &LinkedIn,
    }
}

pub mod cleaner;
pub mod dedupe;
pub mod importer;
pub mod normalize;

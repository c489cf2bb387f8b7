// Fantasy football domain logic: scoring, valuation, roster rules, trade
// evaluation, analysis queries, and CSV import/export.

pub mod analysis;
pub mod csv_io;
pub mod roster;
pub mod scoring;
pub mod trade;
pub mod valuation;

//! Scenario-based tests for the release pipeline

mod helpers;

mod chart_update;
mod main_branch;
mod review_branch;

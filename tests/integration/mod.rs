//! Integration tests for trace load-balancing fleet reconciliation

mod commit_rollback;
mod run_guards;
mod scenario;
mod support;

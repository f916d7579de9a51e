//! The per-terminal watch loop.
//!
//! One manager instance watches every pane of the host. On each
//! content-change notification it extracts the pane's last rendered line,
//! finds the first matching rule and types the dispatched result back into
//! the pane. Writing into the pane produces further change notifications
//! for that same pane; the busy-set turns those into no-ops instead of
//! recursion.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::{debug, warn};
use trigwatch_dispatch::Dispatcher;
use trigwatch_rules::RuleSet;

use crate::host::{TerminalHost, TerminalId, TerminalPane, WatchHandle};

/// Watches the host's terminals and fires trigger rules.
///
/// All state lives behind `RefCell`s because every call arrives on the
/// host's single event-loop thread, including re-entrant notifications
/// caused by our own writes.
pub struct WatchManager<H: TerminalHost> {
    host: H,
    rules: RuleSet,
    dispatcher: Dispatcher,
    watches: RefCell<HashMap<TerminalId, WatchHandle>>,
    busy: RefCell<HashSet<TerminalId>>,
    /// Compiled patterns; `None` marks a pattern that failed to compile so
    /// the error is logged once, not on every keystroke.
    regexes: RefCell<HashMap<String, Option<Regex>>>,
}

impl<H: TerminalHost> WatchManager<H> {
    pub fn new(host: H, rules: RuleSet, dispatcher: Dispatcher) -> Self {
        Self {
            host,
            rules,
            dispatcher,
            watches: RefCell::new(HashMap::new()),
            busy: RefCell::new(HashSet::new()),
            regexes: RefCell::new(HashMap::new()),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Number of panes currently subscribed.
    pub fn watched_count(&self) -> usize {
        self.watches.borrow().len()
    }

    /// Subscribe to any live pane we have not seen yet. Panes are never
    /// unsubscribed here; the host drops the subscription with the pane.
    pub fn update_watches(&self) {
        let missing: Vec<TerminalId> = {
            let watches = self.watches.borrow();
            self.host
                .terminals()
                .iter()
                .map(|pane| pane.id())
                .filter(|id| !watches.contains_key(id))
                .collect()
        };
        for id in missing {
            let handle = self.host.subscribe(id);
            debug!(terminal = id, "watch registered");
            self.watches.borrow_mut().insert(id, handle);
        }
    }

    /// Content-change notification handler. Always returns `true`: the
    /// subscription stays alive no matter what happened during the cycle.
    pub fn on_contents_changed(&self, id: TerminalId) -> bool {
        self.update_watches();

        if self.busy.borrow().contains(&id) {
            debug!(terminal = id, "already processing, ignoring notification");
            return true;
        }
        let _guard = BusyGuard::enter(&self.busy, id);

        let Some(pane) = self.host.terminals().into_iter().find(|p| p.id() == id) else {
            return true;
        };
        let line = last_line(&pane);
        if line.is_empty() {
            return true;
        }
        debug!(terminal = id, line = %line, "checking line");

        for rule in self.rules.iter().filter(|rule| rule.enabled) {
            if !self.pattern_matches(&rule.pattern, &line) {
                continue;
            }
            let result = match self.dispatcher.execute(&rule.action) {
                Ok(result) => result,
                Err(err) => {
                    warn!(pattern = %rule.pattern, "trigger action failed: {err:#}");
                    None
                }
            };
            debug!(pattern = %rule.pattern, result = ?result, "trigger matched");
            insert_response(&pane, result, rule.emit_newline);
            break;
        }
        true
    }

    /// Prefix-match `pattern` against `line`: the pattern is anchored at
    /// column 0 but need not consume the whole line.
    fn pattern_matches(&self, pattern: &str, line: &str) -> bool {
        let mut cache = self.regexes.borrow_mut();
        let compiled = cache.entry(pattern.to_string()).or_insert_with(|| {
            match Regex::new(&format!("^(?:{pattern})")) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!(pattern = %pattern, "invalid trigger pattern: {err}");
                    None
                }
            }
        });
        compiled.as_ref().is_some_and(|regex| regex.is_match(line))
    }
}

/// Membership in the busy-set for the duration of one cycle. Dropping the
/// guard clears the flag on every exit path.
struct BusyGuard<'a> {
    busy: &'a RefCell<HashSet<TerminalId>>,
    id: TerminalId,
}

impl<'a> BusyGuard<'a> {
    fn enter(busy: &'a RefCell<HashSet<TerminalId>>, id: TerminalId) -> Self {
        busy.borrow_mut().insert(id);
        Self { busy, id }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.borrow_mut().remove(&self.id);
    }
}

/// Text of the pane's final visible row, from column 0 to the pane width.
/// If the extracted range spans multiple lines only the text after the last
/// break counts.
fn last_line<P: TerminalPane>(pane: &P) -> String {
    let row = pane.cursor_row();
    let text = pane.text_range(row, 0, row, pane.column_count());
    let text = text.strip_suffix('\n').unwrap_or(&text);
    text.rsplit('\n').next().unwrap_or("").to_string()
}

/// Type a dispatch result into the pane: trailing whitespace stripped, an
/// absent or empty result skipped with a log line, a line terminator
/// appended when the rule asks for one.
fn insert_response<P: TerminalPane>(pane: &P, result: Option<String>, emit_newline: bool) {
    let Some(text) = result else {
        debug!(terminal = pane.id(), "no response to insert");
        return;
    };
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        debug!(terminal = pane.id(), "dropping empty trigger response");
        return;
    }
    let mut bytes = trimmed.as_bytes().to_vec();
    if emit_newline {
        bytes.push(b'\n');
    }
    if let Err(err) = pane.write_input(&bytes) {
        warn!(terminal = pane.id(), "failed to write response: {err:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::rc::Rc;

    #[derive(Clone)]
    struct RowPane {
        rows: Rc<Vec<String>>,
        written: Rc<RefCell<Vec<u8>>>,
    }

    impl RowPane {
        fn new(rows: &[&str]) -> Self {
            Self {
                rows: Rc::new(rows.iter().map(|r| r.to_string()).collect()),
                written: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl TerminalPane for RowPane {
        fn id(&self) -> TerminalId {
            1
        }

        fn cursor_row(&self) -> usize {
            self.rows.len() - 1
        }

        fn column_count(&self) -> usize {
            80
        }

        fn text_range(
            &self,
            start_row: usize,
            _start_col: usize,
            _end_row: usize,
            _end_col: usize,
        ) -> String {
            self.rows[start_row].clone()
        }

        fn write_input(&self, bytes: &[u8]) -> Result<()> {
            self.written.borrow_mut().extend_from_slice(bytes);
            Ok(())
        }
    }

    #[test]
    fn last_line_takes_text_after_final_break() {
        let pane = RowPane::new(&["$ make", "error: x\n$ "]);
        assert_eq!(last_line(&pane), "$ ");
    }

    #[test]
    fn last_line_strips_single_trailing_newline() {
        let pane = RowPane::new(&["password:\n"]);
        assert_eq!(last_line(&pane), "password:");
    }

    #[test]
    fn insert_skips_empty_after_trim() {
        let pane = RowPane::new(&["x"]);
        insert_response(&pane, Some("   \n".to_string()), true);
        assert!(pane.written.borrow().is_empty());
    }

    #[test]
    fn insert_strips_trailing_whitespace_and_appends_newline() {
        let pane = RowPane::new(&["x"]);
        insert_response(&pane, Some("pong  \n".to_string()), true);
        assert_eq!(pane.written.borrow().as_slice(), b"pong\n");
    }

    #[test]
    fn insert_without_newline_flag_writes_bare_text() {
        let pane = RowPane::new(&["x"]);
        insert_response(&pane, Some("pong".to_string()), false);
        assert_eq!(pane.written.borrow().as_slice(), b"pong");
    }
}

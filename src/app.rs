/*
 * This file is part of Sensorview.
 *
 * Copyright (C) 2025 Sensorview contributors
 *
 * Sensorview is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Sensorview is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Sensorview. If not, see <https://www.gnu.org/licenses/>.
 */

use std::time::{Duration, Instant};

use crate::backend::SensorBackend;
use crate::discovery::Sensors;
use crate::error::Result;
use crate::refresher::{Refresher, TickOutcome};
use crate::snapshot::{ExpandState, Row, RowKey, Snapshot, VisibleRow};

pub const DEFAULT_STATUS: &str =
    "↑/↓: move | Enter/Space: expand/collapse | e/c: expand/collapse all | /: search | i: info | r: refresh | ?: help | q: quit";

const PAGE_STEP: usize = 10;

pub struct App {
    pub refresher: Refresher,
    pub expand: ExpandState,
    pub selected: usize,
    /// Selection anchor that survives rebuilds.
    pub selected_key: Option<RowKey>,
    pub show_info_column: bool,
    pub search_mode: bool,
    pub search_input: String,
    pub show_help_popup: bool,
    pub status: String,
    pub last_error: Option<String>,
}

impl App {
    pub fn new(refresh_interval: Duration, show_info_column: bool) -> Self {
        Self {
            refresher: Refresher::new(refresh_interval),
            expand: ExpandState::default(),
            selected: 0,
            selected_key: None,
            show_info_column,
            search_mode: false,
            search_input: String::new(),
            show_help_popup: false,
            status: DEFAULT_STATUS.to_string(),
            last_error: None,
        }
    }

    /// Runs one refresher tick. Only a lost backend is returned as an error;
    /// anything else lands in the status line and the old snapshot stays up.
    pub fn tick<B: SensorBackend>(&mut self, now: Instant, sensors: &Sensors<'_, B>) -> Result<TickOutcome> {
        match self.refresher.tick(now, sensors) {
            Ok(outcome) => {
                if outcome == TickOutcome::Refreshed {
                    self.last_error = None;
                    self.status = DEFAULT_STATUS.to_string();
                    let snapshot = self.refresher.snapshot();
                    self.expand.retain_present(&snapshot);
                    self.reanchor(&snapshot);
                }
                Ok(outcome)
            }
            Err(e) if !e.is_recoverable() => Err(e),
            Err(e) => {
                self.last_error = Some(e.to_string());
                Ok(TickOutcome::NotDue)
            }
        }
    }

    pub fn time_until_refresh(&self, now: Instant) -> Duration {
        self.refresher.time_until_due(now)
    }

    pub fn force_refresh(&mut self) {
        self.refresher.force();
    }

    /// Rows to draw: the expand state applies unless a search is active, in
    /// which case matching rows are shown with their ancestors.
    pub fn visible_rows<'a>(&self, snapshot: &'a Snapshot) -> Vec<VisibleRow<'a>> {
        let query = self.search_input.trim().to_lowercase();
        if query.is_empty() {
            return self.expand.visible_rows(snapshot);
        }
        let mut out = Vec::new();
        for row in &snapshot.rows {
            collect_matches(row, 0, &query, &mut out);
        }
        out
    }

    fn reanchor(&mut self, snapshot: &Snapshot) {
        let rows = self.visible_rows(snapshot);
        if let Some(key) = &self.selected_key {
            if let Some(idx) = rows.iter().position(|vr| &vr.row.key == key) {
                self.selected = idx;
                return;
            }
        }
        self.select(&rows, self.selected);
    }

    fn select(&mut self, rows: &[VisibleRow<'_>], idx: usize) {
        if rows.is_empty() {
            self.selected = 0;
            self.selected_key = None;
            return;
        }
        self.selected = idx.min(rows.len() - 1);
        self.selected_key = Some(rows[self.selected].row.key.clone());
    }

    fn with_rows(&mut self, f: impl FnOnce(&mut Self, &[VisibleRow<'_>])) {
        let snapshot = self.refresher.snapshot();
        let rows = self.visible_rows(&snapshot);
        f(self, &rows);
    }

    pub fn move_up(&mut self, step: usize) {
        self.with_rows(|app, rows| {
            let idx = app.selected.saturating_sub(step);
            app.select(rows, idx);
        });
    }

    pub fn move_down(&mut self, step: usize) {
        self.with_rows(|app, rows| {
            let idx = app.selected.saturating_add(step);
            app.select(rows, idx);
        });
    }

    pub fn page_up(&mut self) {
        self.move_up(PAGE_STEP);
    }

    pub fn page_down(&mut self) {
        self.move_down(PAGE_STEP);
    }

    pub fn select_first(&mut self) {
        self.with_rows(|app, rows| app.select(rows, 0));
    }

    pub fn select_last(&mut self) {
        self.with_rows(|app, rows| app.select(rows, usize::MAX));
    }

    pub fn selected_row(&self) -> Option<Row> {
        let snapshot = self.refresher.snapshot();
        let rows = self.visible_rows(&snapshot);
        rows.get(self.selected).map(|vr| vr.row.clone())
    }

    pub fn toggle_selected(&mut self) {
        if let Some(row) = self.selected_row() {
            if !row.children.is_empty() {
                self.expand.toggle(&row.key);
                self.with_rows(|app, rows| app.select(rows, app.selected));
            }
        }
    }

    pub fn expand_selected(&mut self) {
        if let Some(row) = self.selected_row() {
            self.expand.expand(&row.key);
        }
    }

    /// Collapses the selected row, or moves to its parent when it is
    /// already collapsed or has no children.
    pub fn collapse_selected(&mut self) {
        let Some(row) = self.selected_row() else { return };
        if !row.children.is_empty() && self.expand.is_expanded(&row.key) {
            self.expand.collapse(&row.key);
            return;
        }
        self.with_rows(|app, rows| {
            let depth = rows.get(app.selected).map(|vr| vr.depth).unwrap_or(0);
            if depth == 0 {
                return;
            }
            if let Some(parent) = rows[..app.selected].iter().rposition(|vr| vr.depth < depth) {
                app.select(rows, parent);
            }
        });
    }

    pub fn expand_all(&mut self) {
        self.expand.expand_all();
        self.with_rows(|app, rows| app.select(rows, app.selected));
    }

    pub fn collapse_all(&mut self) {
        let snapshot = self.refresher.snapshot();
        self.expand.collapse_all(&snapshot);
        self.with_rows(|app, rows| app.select(rows, 0));
    }

    pub fn toggle_info_column(&mut self) {
        self.show_info_column = !self.show_info_column;
    }

    pub fn start_search(&mut self) {
        self.search_mode = true;
    }

    pub fn push_search_char(&mut self, c: char) {
        self.search_input.push(c);
        self.with_rows(|app, rows| app.select(rows, 0));
    }

    pub fn pop_search_char(&mut self) {
        self.search_input.pop();
        self.with_rows(|app, rows| app.select(rows, 0));
    }

    pub fn finish_search(&mut self) {
        self.search_mode = false;
    }

    pub fn cancel_search(&mut self) {
        self.search_mode = false;
        self.search_input.clear();
        self.with_rows(|app, rows| {
            let idx = app
                .selected_key
                .as_ref()
                .and_then(|k| rows.iter().position(|vr| &vr.row.key == k))
                .unwrap_or(0);
            app.select(rows, idx);
        });
    }
}

fn row_matches(row: &Row, query: &str) -> bool {
    row.name.to_lowercase().contains(query) || row.value.to_lowercase().contains(query)
}

fn push_subtree<'a>(row: &'a Row, depth: usize, out: &mut Vec<VisibleRow<'a>>) {
    out.push(VisibleRow { row, depth });
    for child in &row.children {
        push_subtree(child, depth + 1, out);
    }
}

/// A matching row is shown with its whole subtree; a non-matching row only
/// when one of its descendants matches. Returns whether anything was pushed.
fn collect_matches<'a>(row: &'a Row, depth: usize, query: &str, out: &mut Vec<VisibleRow<'a>>) -> bool {
    if row_matches(row, query) {
        push_subtree(row, depth, out);
        return true;
    }
    let mark = out.len();
    out.push(VisibleRow { row, depth });
    let mut any_child = false;
    for child in &row.children {
        any_child |= collect_matches(child, depth + 1, query, out);
    }
    if !any_child {
        out.truncate(mark);
    }
    any_child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Adapter, MockValue};
    use crate::error::SensorsError;
    use crate::test_utils::test_helpers::*;

    fn create_test_app() -> (App, crate::backend::MockBackend) {
        let backend = create_mock_board();
        let mut adapter = Adapter::new(backend.clone());
        adapter.initialize().unwrap();
        let sensors = Sensors::new(&adapter);
        let mut app = App::new(Duration::from_millis(1000), true);
        assert_eq!(app.tick(Instant::now(), &sensors).unwrap(), TickOutcome::Refreshed);
        (app, backend)
    }

    fn names(app: &App) -> Vec<String> {
        let snap = app.refresher.snapshot();
        app.visible_rows(&snap).iter().map(|vr| vr.row.name.clone()).collect()
    }

    #[test]
    fn test_app_initialization() {
        let app = App::new(Duration::from_millis(500), false);
        assert_eq!(app.refresher.interval(), Duration::from_millis(500));
        assert!(!app.show_info_column);
        assert_eq!(app.selected, 0);
        assert!(app.selected_key.is_none());
        assert_eq!(app.status, DEFAULT_STATUS);
        assert!(app.refresher.snapshot().rows.is_empty());
    }

    #[test]
    fn test_navigation_clamps() {
        let (mut app, _) = create_test_app();
        let total = names(&app).len();
        app.move_up(1);
        assert_eq!(app.selected, 0);
        app.move_down(1000);
        assert_eq!(app.selected, total - 1);
        app.select_first();
        assert_eq!(app.selected, 0);
        app.page_down();
        assert_eq!(app.selected, PAGE_STEP.min(total - 1));
        app.select_last();
        assert_eq!(app.selected, total - 1);
    }

    #[test]
    fn test_toggle_and_collapse_to_parent() {
        let (mut app, _) = create_test_app();
        let before = names(&app).len();
        app.select_first();
        app.toggle_selected();
        // coretemp folds away its six rows
        assert_eq!(names(&app).len(), before - 6);
        app.toggle_selected();
        assert_eq!(names(&app).len(), before);

        // from a subfeature, Left jumps to the owning feature
        app.move_down(2);
        let feature_idx = 1;
        app.collapse_selected();
        assert_eq!(app.selected, feature_idx);
        app.collapse_selected();
        assert!(!app.expand.is_expanded(app.selected_key.as_ref().unwrap()));
        app.expand_selected();
        assert!(app.expand.is_expanded(app.selected_key.as_ref().unwrap()));
    }

    #[test]
    fn test_collapse_all_and_expand_all() {
        let (mut app, _) = create_test_app();
        let total = names(&app).len();
        app.collapse_all();
        assert_eq!(names(&app).len(), 2);
        app.expand_all();
        assert_eq!(names(&app).len(), total);
    }

    #[test]
    fn test_selection_survives_refresh() {
        let (mut app, backend) = create_test_app();
        app.move_down(3);
        let key = app.selected_key.clone().unwrap();

        backend.set_value(&coretemp_chip(), 0, MockValue::Unavailable);
        let mut adapter = Adapter::new(backend.clone());
        adapter.initialize().unwrap();
        let sensors = Sensors::new(&adapter);
        app.force_refresh();
        app.tick(Instant::now(), &sensors).unwrap();
        assert_eq!(app.selected_key.as_ref(), Some(&key));
        assert_eq!(app.selected, 3);
    }

    #[test]
    fn test_search_filters_with_ancestors() {
        let (mut app, _) = create_test_app();
        app.start_search();
        for c in "cpu fan".chars() {
            app.push_search_char(c);
        }
        let shown = names(&app);
        assert_eq!(shown, vec!["nct6775-isa-0290".to_string(), "CPU fan".to_string(), "fan1_input".to_string(), "fan1_min".to_string()]);
        app.finish_search();
        assert!(!app.search_mode);
        assert_eq!(app.search_input, "cpu fan");
        app.cancel_search();
        assert!(app.search_input.is_empty());
    }

    #[test]
    fn test_collapse_survives_transient_chip_failure() {
        let (mut app, backend) = create_test_app();
        let fan1 = RowKey::Feature { chip: nct6775_chip(), name: "fan1".to_string(), number: 0 };
        app.expand.collapse(&fan1);

        let mut adapter = Adapter::new(backend.clone());
        adapter.initialize().unwrap();
        let sensors = Sensors::new(&adapter);

        backend.fail_features(&nct6775_chip(), Some("bus error"));
        app.force_refresh();
        assert_eq!(app.tick(Instant::now(), &sensors).unwrap(), TickOutcome::Refreshed);
        let snap = app.refresher.snapshot();
        assert!(snap.find(&fan1).is_none());
        assert!(snap.find(&RowKey::Chip { chip: nct6775_chip() }).is_some());

        backend.fail_features(&nct6775_chip(), None);
        app.force_refresh();
        app.tick(Instant::now(), &sensors).unwrap();
        assert!(app.refresher.snapshot().find(&fan1).is_some());
        assert!(!app.expand.is_expanded(&fan1));
        assert!(!names(&app).contains(&"fan1_input".to_string()));
    }

    #[test]
    fn test_removed_chip_forgets_collapse_state() {
        let (mut app, backend) = create_test_app();
        let chip_key = RowKey::Chip { chip: nct6775_chip() };
        app.expand.collapse(&chip_key);

        let mut adapter = Adapter::new(backend.clone());
        adapter.initialize().unwrap();
        let sensors = Sensors::new(&adapter);

        backend.remove_chip(&nct6775_chip());
        app.force_refresh();
        app.tick(Instant::now(), &sensors).unwrap();
        assert_eq!(app.refresher.snapshot().chip_count, 1);
        assert!(app.expand.is_expanded(&chip_key));

        // plugged back in: starts expanded like any new chip
        backend.add_chip(nct6775_chip());
        app.force_refresh();
        app.tick(Instant::now(), &sensors).unwrap();
        assert!(app.refresher.snapshot().find(&chip_key).is_some());
        assert!(app.expand.is_expanded(&chip_key));
    }

    #[test]
    fn test_lost_backend_is_fatal() {
        let backend = create_mock_board();
        let adapter = Adapter::new(backend);
        let sensors = Sensors::new(&adapter);
        let mut app = App::new(Duration::from_millis(1000), true);
        assert!(matches!(
            app.tick(Instant::now(), &sensors),
            Err(SensorsError::BackendUnavailable(_))
        ));
    }
}

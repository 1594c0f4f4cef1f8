use std::collections::{HashMap, HashSet, VecDeque};

use crate::device::driver::Key;
use crate::device::snapshot::TextMatch;
use crate::navigation::page::PageId;

/// Gesture bound to a navigation edge.
#[derive(Debug, Clone, PartialEq)]
pub enum NavAction {
    Press(Key),
    ScreenOn,
    /// Swipe up on the lock screen, then type the PIN on the keypad.
    Unlock,
    TapText { text: &'static str, mode: TextMatch },
    TapDesc { text: &'static str, mode: TextMatch },
    /// Tap a screen position given as fractions of the screen size.
    TapScreen { x: f64, y: f64 },
}

/// Directed edge: performing `action` on `from` is expected to land on `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct NavEdge {
    pub from: PageId,
    pub to: PageId,
    pub action: NavAction,
}

impl NavEdge {
    pub fn new(from: PageId, to: PageId, action: NavAction) -> Self {
        Self { from, to, action }
    }
}

/// Static transition graph between pages.
#[derive(Debug, Clone, Default)]
pub struct NavGraph {
    edges: Vec<NavEdge>,
}

impl NavGraph {
    pub fn new(edges: Vec<NavEdge>) -> Self {
        Self { edges }
    }

    /// Transitions of the vacuum app and the phone shell around it.
    pub fn vacuum_app() -> Self {
        use NavAction::*;
        use PageId::*;

        let tap_text = |text| TapText {
            text,
            mode: TextMatch::Exact,
        };

        Self::new(vec![
            NavEdge::new(None, Desktop, Press(Key::Home)),
            NavEdge::new(ScreenOff, Lock, ScreenOn),
            NavEdge::new(Lock, Desktop, Unlock),
            NavEdge::new(
                Desktop,
                Main,
                TapText {
                    text: "ECOVACS HOME",
                    mode: TextMatch::Contains,
                },
            ),
            NavEdge::new(
                Main,
                Scenario,
                TapDesc {
                    text: "Scenario Clean",
                    mode: TextMatch::Exact,
                },
            ),
            NavEdge::new(Scenario, Main, TapScreen { x: 0.5, y: 0.5 }),
            NavEdge::new(
                Main,
                Robot,
                TapDesc {
                    text: "Enter",
                    mode: TextMatch::Exact,
                },
            ),
            NavEdge::new(RobotSettings, Desktop, Press(Key::Back)),
            NavEdge::new(Robot, Main, tap_text("Back")),
            NavEdge::new(Station, Main, tap_text("Back")),
            NavEdge::new(Robot, Station, tap_text("Station")),
            NavEdge::new(
                Station,
                Robot,
                TapText {
                    text: "ROBOT ",
                    mode: TextMatch::Contains,
                },
            ),
            NavEdge::new(Warning, None, tap_text("Ignore")),
        ])
    }

    pub fn edges(&self) -> &[NavEdge] {
        &self.edges
    }

    /// First declared edge from `from` to `to`.
    pub fn edge(&self, from: PageId, to: PageId) -> Option<&NavEdge> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }

    fn neighbors(&self, page: PageId) -> impl Iterator<Item = PageId> + '_ {
        self.edges.iter().filter(move |e| e.from == page).map(|e| e.to)
    }

    /// Shortest hop sequence from `start` to `goal` (breadth-first).
    ///
    /// Equal-length paths are resolved by edge declaration order. Returns
    /// an empty path when `start == goal` and `None` when unreachable.
    pub fn find_path(&self, start: PageId, goal: PageId) -> Option<Vec<(PageId, PageId)>> {
        let mut came_from: HashMap<PageId, PageId> = HashMap::new();
        let mut visited: HashSet<PageId> = HashSet::from([start]);
        let mut queue: VecDeque<PageId> = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            if current == goal {
                let mut path = Vec::new();
                let mut node = current;
                while let Some(&prev) = came_from.get(&node) {
                    path.push((prev, node));
                    node = prev;
                }
                path.reverse();
                return Some(path);
            }

            for next in self.neighbors(current) {
                if visited.insert(next) {
                    came_from.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        None
    }
}

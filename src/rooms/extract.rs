use crate::device::snapshot::{Node, Snapshot};
use crate::rooms::normalize::{clean_label, normalize_label};

/// Resource id of the map overlay that holds the room toggles.
pub const ROOM_CONTAINER_ID: &str = "3d-map-out-div-9527";
pub const BUTTON_CLASS: &str = "android.widget.Button";
pub const TEXT_VIEW_CLASS: &str = "android.widget.TextView";

/// A room toggle seen in one snapshot. Borrows its node, so it cannot
/// outlive the snapshot it was read from.
#[derive(Debug, Clone)]
pub struct Room<'a> {
    /// Label exactly as shown, icon prefix included.
    pub raw_label: String,
    /// Label with the icon prefix removed; used as the entity display name.
    pub name: String,
    pub normalized: String,
    pub enabled: bool,
    /// Which selection signal fired, if any.
    pub signal: Option<&'static str>,
    pub node: &'a Node,
}

/// A room button together with the element that directly contains it.
pub struct ButtonContext<'a> {
    pub button: &'a Node,
    pub parent: &'a Node,
}

/// One way the app marks a room as selected.
pub struct SelectionSignal {
    pub name: &'static str,
    pub test: fn(&ButtonContext<'_>) -> bool,
}

fn parent_flagged(ctx: &ButtonContext<'_>) -> bool {
    ctx.parent.is_flagged()
}

/// Selected rooms get a numeric order badge next to their button.
fn sibling_badge(ctx: &ButtonContext<'_>) -> bool {
    ctx.parent.children.iter().any(|sibling| {
        if std::ptr::eq(sibling, ctx.button) || !sibling.is_class(TEXT_VIEW_CLASS) {
            return false;
        }
        let text = sibling.text.trim();
        !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
    })
}

fn button_marked(ctx: &ButtonContext<'_>) -> bool {
    ctx.button.is_flagged() || ctx.button.index > 0
}

/// Evaluated in order; the first signal that holds decides.
pub const SELECTION_SIGNALS: [SelectionSignal; 3] = [
    SelectionSignal {
        name: "parent-flag",
        test: parent_flagged,
    },
    SelectionSignal {
        name: "sibling-badge",
        test: sibling_badge,
    },
    SelectionSignal {
        name: "button-flag",
        test: button_marked,
    },
];

pub fn selection_signal(ctx: &ButtonContext<'_>) -> Option<&'static str> {
    SELECTION_SIGNALS
        .iter()
        .find(|signal| (signal.test)(ctx))
        .map(|signal| signal.name)
}

/// Room buttons inside the map container, with their parents.
pub fn room_buttons(snapshot: &Snapshot) -> Vec<ButtonContext<'_>> {
    let Some(container) = snapshot.find_by_resource_id(ROOM_CONTAINER_ID) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    collect_buttons(container, &mut found);
    found
}

fn collect_buttons<'a>(parent: &'a Node, found: &mut Vec<ButtonContext<'a>>) {
    for child in &parent.children {
        if child.is_class(BUTTON_CLASS) {
            found.push(ButtonContext {
                button: child,
                parent,
            });
        }
        collect_buttons(child, found);
    }
}

/// All labelled room toggles on the map, in document order.
pub fn extract_rooms(snapshot: &Snapshot) -> Vec<Room<'_>> {
    room_buttons(snapshot)
        .into_iter()
        .filter_map(|ctx| {
            let name = clean_label(&ctx.button.text);
            if name.is_empty() {
                return None;
            }
            let signal = selection_signal(&ctx);
            Some(Room {
                raw_label: ctx.button.text.clone(),
                normalized: normalize_label(&name),
                name,
                enabled: signal.is_some(),
                signal,
                node: ctx.button,
            })
        })
        .collect()
}

/// Exact normalized-label lookup.
pub fn find_room<'r, 'a>(rooms: &'r [Room<'a>], label: &str) -> Option<&'r Room<'a>> {
    let wanted = normalize_label(label);
    rooms.iter().find(|r| r.normalized == wanted)
}

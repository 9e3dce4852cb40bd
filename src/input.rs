use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use std::time::Duration;

const MAX_EVENTS_PER_FRAME: usize = 64;

/// Terminal events the app cares about. Pointer positions are terminal cells;
/// the app maps them into logical units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    ToggleHud,
    PointerMoved { col: u16, row: u16 },
    Clicked { col: u16, row: u16 },
    PointerLeft,
    Resized { cols: u16, rows: u16 },
}

pub fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        if let Some(ev) = map_event(event::read()?) {
            out.push(ev);
            if out.len() >= MAX_EVENTS_PER_FRAME {
                break;
            }
        }
    }
    Ok(out)
}

pub fn map_event(ev: Event) -> Option<InputEvent> {
    match ev {
        Event::Key(k) => map_key(k),
        Event::Mouse(m) => map_mouse(m),
        Event::FocusLost => Some(InputEvent::PointerLeft),
        Event::Resize(cols, rows) => Some(InputEvent::Resized { cols, rows }),
        _ => None,
    }
}

fn map_key(k: KeyEvent) -> Option<InputEvent> {
    if k.kind != KeyEventKind::Press {
        return None;
    }
    match k.code {
        KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(InputEvent::Quit)
        }
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(InputEvent::Quit),
        KeyCode::Char('h') | KeyCode::Char('H') => Some(InputEvent::ToggleHud),
        _ => None,
    }
}

fn map_mouse(m: MouseEvent) -> Option<InputEvent> {
    let (col, row) = (m.column, m.row);
    match m.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) => {
            Some(InputEvent::PointerMoved { col, row })
        }
        MouseEventKind::Down(MouseButton::Left) => Some(InputEvent::Clicked { col, row }),
        _ => None,
    }
}

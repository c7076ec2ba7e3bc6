use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEventKind,
};
use crossterm::execute;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use std::cmp::Reverse;
use std::time::{Duration, Instant};

use crate::chat::{ChatSession, LinkStatus, EMOJI};
use crate::config::{self, display_name, get_settings};
use crate::core::calculation::{CalculationGame, Phase, SubmitOutcome, TickOutcome, ROUNDS};
use crate::core::memory::{MemoryGame, RevealOutcome, TileFace, TILE_COUNT};
use crate::core::registry::{BandAnchor, CascadeSlot, WindowRegistry};
use crate::core::scoreboard::ScoreEntry;
use crate::core::tictoc::{Outcome, TicTocGame, CELLS};
use crate::scores::{ScoreStore, GAME_CALCULATION, GAME_MEMORY};
use crate::status::{login_button_rect, render_status_bar};
use crate::ui::{
    confirm, dim_style, flash_message, input_prompt, normal_style, sel_style, title_style, Term,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppLaunch {
    Memory,
    Calculation,
    TicToc,
    Chat,
}

#[derive(Debug, Clone, Copy)]
struct WinRect {
    x: i32,
    y: i32,
    w: u16,
    h: u16,
}

impl WinRect {
    fn contains(self, x: u16, y: u16) -> bool {
        let x0 = self.x.max(0) as u16;
        let y0 = self.y.max(0) as u16;
        let x1 = x0.saturating_add(self.w);
        let y1 = y0.saturating_add(self.h);
        x >= x0 && x < x1 && y >= y0 && y < y1
    }

    fn to_rect(self) -> Rect {
        Rect {
            x: self.x.max(0) as u16,
            y: self.y.max(0) as u16,
            width: self.w,
            height: self.h,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GameView {
    Board,
    Scores,
}

struct MemoryWindow {
    game: MemoryGame,
    cursor: usize,
    view: GameView,
    scorelist: Vec<ScoreEntry>,
    last_second: Instant,
}

impl MemoryWindow {
    fn new() -> Self {
        Self {
            game: MemoryGame::new(),
            cursor: 0,
            view: GameView::Board,
            scorelist: Vec::new(),
            last_second: Instant::now(),
        }
    }
}

struct CalcWindow {
    game: CalculationGame,
    input: String,
    view: GameView,
    scorelist: Vec<ScoreEntry>,
    last_second: Instant,
}

impl CalcWindow {
    fn new() -> Self {
        Self {
            game: CalculationGame::new(),
            input: String::new(),
            view: GameView::Board,
            scorelist: Vec::new(),
            last_second: Instant::now(),
        }
    }
}

struct TicTocWindow {
    game: TicTocGame,
    cursor: usize,
}

impl TicTocWindow {
    fn new() -> Self {
        Self {
            game: TicTocGame::new(),
            cursor: 4,
        }
    }
}

struct ChatWindow {
    session: ChatSession,
    input: String,
    scroll: usize,
    emoji_open: bool,
    needs_name: bool,
    name_input: String,
    name_error: bool,
}

impl ChatWindow {
    // With no stored nickname the window opens on its login field and
    // only dials once a name has been taken.
    fn open() -> Self {
        let session = ChatSession::new(get_settings().chat);
        let needs_name = config::get_nickname().is_none();
        if !needs_name {
            session.connect();
        }
        Self {
            session,
            input: String::new(),
            scroll: 0,
            emoji_open: false,
            needs_name,
            name_input: String::new(),
            name_error: false,
        }
    }
}

enum WindowKind {
    Memory(MemoryWindow),
    Calculation(CalcWindow),
    TicToc(TicTocWindow),
    Chat(ChatWindow),
}

struct DesktopWindow {
    id: u64,
    title: String,
    rect: WinRect,
    z: u64,
    kind: WindowKind,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    window_id: u64,
    dx: i32,
    dy: i32,
}

#[derive(Debug, Clone, Copy)]
struct TaskButton {
    window_id: u64,
    rect: Rect,
}

struct TaskbarLayout {
    buttons: Vec<TaskButton>,
    prev_rect: Option<Rect>,
    next_rect: Option<Rect>,
    can_scroll_left: bool,
    can_scroll_right: bool,
}

impl TaskbarLayout {
    fn empty() -> Self {
        Self {
            buttons: Vec::new(),
            prev_rect: None,
            next_rect: None,
            can_scroll_left: false,
            can_scroll_right: false,
        }
    }
}

struct DesktopState {
    windows: Vec<DesktopWindow>,
    next_id: u64,
    registry: WindowRegistry,
    scores: ScoreStore,
    cursor_x: u16,
    cursor_y: u16,
    dragging: Option<DragState>,
    task_scroll: usize,
}

impl DesktopState {
    fn new(scores: ScoreStore) -> Self {
        Self {
            windows: Vec::new(),
            next_id: 1,
            registry: WindowRegistry::new(),
            scores,
            cursor_x: 0,
            cursor_y: 0,
            dragging: None,
            task_scroll: 0,
        }
    }
}

const TITLE_CLOSE_BUTTON: &str = "[X]";
const TASK_PAGER_PREV: &str = "[<]";
const TASK_PAGER_NEXT: &str = "[>]";
const GAME_PANEL: [&str; 3] = ["[New Game]", "[Score]", "[Restart Score]"];
const BTN_START: &str = "[Let the game begin?]";
const BTN_SCORELIST: &str = "[Display Scorelist]";
const CHAT_EMOJI_BUTTON: &str = "[:)]";
const CHAT_SEND_BUTTON: &str = "[Send]";
const EMOJI_COLS: usize = 8;

const DESKTOP_ICONS: [(AppLaunch, &str, &str); 4] = [
    (AppLaunch::Memory, "[::]", "Memory"),
    (AppLaunch::Calculation, "[+=]", "Calculation"),
    (AppLaunch::TicToc, "[XO]", "Tic Toc"),
    (AppLaunch::Chat, "[@@]", "Chat"),
];

fn app_title(app: AppLaunch) -> &'static str {
    match app {
        AppLaunch::Memory => "Memory Game",
        AppLaunch::Calculation => "Calculation Game",
        AppLaunch::TicToc => "Tic Toc",
        AppLaunch::Chat => "Chat",
    }
}

fn window_size_for_app(app: AppLaunch) -> (u16, u16) {
    match app {
        AppLaunch::Memory => (37, 15),
        AppLaunch::Calculation => (37, 13),
        AppLaunch::TicToc => (20, 12),
        AppLaunch::Chat => (44, 18),
    }
}

fn window_size_for_kind(kind: &WindowKind) -> (u16, u16) {
    match kind {
        WindowKind::Memory(_) => window_size_for_app(AppLaunch::Memory),
        WindowKind::Calculation(_) => window_size_for_app(AppLaunch::Calculation),
        WindowKind::TicToc(_) => window_size_for_app(AppLaunch::TicToc),
        WindowKind::Chat(_) => window_size_for_app(AppLaunch::Chat),
    }
}

pub fn desktop_mode(terminal: &mut Term) -> Result<()> {
    let _ = terminal.hide_cursor();
    execute!(terminal.backend_mut(), EnableMouseCapture)?;
    let result = run_desktop_loop(terminal);
    let _ = execute!(terminal.backend_mut(), DisableMouseCapture);
    let _ = terminal.show_cursor();
    result
}

fn run_desktop_loop(terminal: &mut Term) -> Result<()> {
    let mut state = DesktopState::new(ScoreStore::open_default());

    loop {
        advance_clocks(&mut state);
        draw_desktop(terminal, &mut state)?;

        let timeout = Duration::from_millis(16);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press && key.kind != KeyEventKind::Repeat {
                        continue;
                    }
                    if handle_key(terminal, &mut state, key.code, key.modifiers)? {
                        shutdown_sessions(&state);
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse(terminal, &mut state, mouse)?;
                }
                Event::Resize(_, _) => {
                    let ts = terminal.size()?;
                    let size = full_rect(ts.width, ts.height);
                    clamp_all_windows(&mut state, desktop_area(size));
                }
                _ => {}
            }
        }
    }
}

// Per-window clocks, driven from the event loop. Each timed window owns
// one anchor; catching up whole seconds keeps the count honest even when
// a frame runs long. Idle and finished games re-anchor instead.
fn advance_clocks(state: &mut DesktopState) {
    let second = Duration::from_secs(1);
    for win in &mut state.windows {
        match &mut win.kind {
            WindowKind::Memory(mw) => {
                if mw.game.is_finished() {
                    mw.last_second = Instant::now();
                } else {
                    while mw.last_second.elapsed() >= second {
                        mw.last_second += second;
                        mw.game.on_second();
                    }
                }
            }
            WindowKind::Calculation(cw) => {
                if cw.game.phase() != Phase::Round {
                    cw.last_second = Instant::now();
                } else {
                    while cw.last_second.elapsed() >= second {
                        cw.last_second += second;
                        if cw.game.on_second() == TickOutcome::Expired {
                            cw.input.clear();
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn handle_key(
    terminal: &mut Term,
    state: &mut DesktopState,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Result<bool> {
    let ts = terminal.size()?;
    let size = full_rect(ts.width, ts.height);
    let desk = desktop_area(size);

    if modifiers.contains(KeyModifiers::CONTROL) {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                if confirm(terminal, "Leave the desktop?")? {
                    return Ok(true);
                }
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                if let Some(id) = focused_window_id(state) {
                    if let Some(win) = state.windows.iter_mut().find(|w| w.id == id) {
                        if let WindowKind::Chat(chat) = &mut win.kind {
                            chat.session.reconnect();
                        }
                    }
                }
            }
            _ => {}
        }
        return Ok(false);
    }

    match code {
        KeyCode::F(1) => spawn_app(state, AppLaunch::Memory, desk),
        KeyCode::F(2) => spawn_app(state, AppLaunch::Calculation, desk),
        KeyCode::F(3) => spawn_app(state, AppLaunch::TicToc, desk),
        KeyCode::F(4) => spawn_app(state, AppLaunch::Chat, desk),
        KeyCode::F(8) => config::cycle_theme(),
        KeyCode::F(9) => toggle_login(terminal, state)?,
        KeyCode::Esc => {
            if let Some(id) = focused_window_id(state) {
                if let Some(win) = state.windows.iter_mut().find(|w| w.id == id) {
                    if let WindowKind::Chat(chat) = &mut win.kind {
                        if chat.emoji_open {
                            chat.emoji_open = false;
                            return Ok(false);
                        }
                    }
                }
                close_window_by_id(state, id);
            }
        }
        _ => {
            if let Some(id) = focused_window_id(state) {
                handle_window_key(state, id, code);
            }
        }
    }
    Ok(false)
}

fn handle_window_key(state: &mut DesktopState, id: u64, code: KeyCode) {
    let Some(idx) = state.windows.iter().position(|w| w.id == id) else {
        return;
    };
    let win = &mut state.windows[idx];
    match &mut win.kind {
        WindowKind::Memory(mw) => memory_key(mw, &state.scores, code),
        WindowKind::Calculation(cw) => calculation_key(cw, &state.scores, code),
        WindowKind::TicToc(tw) => tictoc_key(tw, code),
        WindowKind::Chat(chat) => chat_key(chat, code),
    }
}

fn memory_key(mw: &mut MemoryWindow, store: &ScoreStore, code: KeyCode) {
    if mw.view == GameView::Scores {
        if matches!(code, KeyCode::Enter | KeyCode::Char(' ')) {
            mw.view = GameView::Board;
        }
        return;
    }
    match code {
        KeyCode::Left => {
            if mw.cursor % 4 > 0 {
                mw.cursor -= 1;
            }
        }
        KeyCode::Right => {
            if mw.cursor % 4 < 3 {
                mw.cursor += 1;
            }
        }
        KeyCode::Up => {
            if mw.cursor >= 4 {
                mw.cursor -= 4;
            }
        }
        KeyCode::Down => {
            if mw.cursor + 4 < TILE_COUNT {
                mw.cursor += 4;
            }
        }
        KeyCode::Enter | KeyCode::Char(' ') => memory_reveal(mw, store, mw.cursor),
        _ => {}
    }
}

fn memory_reveal(mw: &mut MemoryWindow, store: &ScoreStore, tile: usize) {
    if let RevealOutcome::Finished { score } = mw.game.reveal(tile) {
        mw.scorelist = store.record(GAME_MEMORY, ScoreEntry::new(display_name(), i64::from(score)));
    }
}

fn calculation_key(cw: &mut CalcWindow, store: &ScoreStore, code: KeyCode) {
    if cw.view == GameView::Scores {
        if matches!(code, KeyCode::Enter | KeyCode::Char(' ')) {
            cw.view = GameView::Board;
        }
        return;
    }
    match cw.game.phase() {
        Phase::Idle => {
            if matches!(code, KeyCode::Enter | KeyCode::Char(' ')) {
                calc_start(cw);
            }
        }
        Phase::Round => match code {
            KeyCode::Enter => calc_submit(cw, store),
            KeyCode::Backspace => {
                cw.input.pop();
            }
            KeyCode::Char(c) => {
                let minus_ok = c == '-' && cw.input.is_empty();
                if (c.is_ascii_digit() || minus_ok) && cw.input.len() < 12 {
                    cw.input.push(c);
                }
            }
            _ => {}
        },
        Phase::Finished => {
            if matches!(code, KeyCode::Enter | KeyCode::Char(' ')) {
                cw.scorelist = store.list(GAME_CALCULATION);
                cw.view = GameView::Scores;
            }
        }
    }
}

fn calc_start(cw: &mut CalcWindow) {
    cw.game.start();
    cw.input.clear();
    cw.view = GameView::Board;
    cw.last_second = Instant::now();
}

fn calc_submit(cw: &mut CalcWindow, store: &ScoreStore) {
    let outcome = cw.game.submit(&cw.input);
    cw.input.clear();
    cw.last_second = Instant::now();
    if outcome == SubmitOutcome::Finished {
        cw.scorelist = store.record(
            GAME_CALCULATION,
            ScoreEntry::new(display_name(), cw.game.total_score()),
        );
        cw.view = GameView::Scores;
    }
}

fn tictoc_key(tw: &mut TicTocWindow, code: KeyCode) {
    match code {
        KeyCode::Left => {
            if tw.cursor % 3 > 0 {
                tw.cursor -= 1;
            }
        }
        KeyCode::Right => {
            if tw.cursor % 3 < 2 {
                tw.cursor += 1;
            }
        }
        KeyCode::Up => {
            if tw.cursor >= 3 {
                tw.cursor -= 3;
            }
        }
        KeyCode::Down => {
            if tw.cursor + 3 < CELLS {
                tw.cursor += 3;
            }
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            tw.game.play(tw.cursor);
        }
        _ => {}
    }
}

fn chat_key(chat: &mut ChatWindow, code: KeyCode) {
    if chat.needs_name {
        match code {
            KeyCode::Enter => {
                let name = chat.name_input.trim().to_string();
                if name.is_empty() {
                    chat.name_error = true;
                } else {
                    config::set_nickname(Some(&name));
                    chat.needs_name = false;
                    chat.name_error = false;
                    chat.session.connect();
                }
            }
            KeyCode::Backspace => {
                chat.name_input.pop();
            }
            KeyCode::Char(c) => {
                if (c as u32) >= 32 {
                    chat.name_input.push(c);
                }
            }
            _ => {}
        }
        return;
    }
    match code {
        KeyCode::Enter => chat_send(chat),
        KeyCode::Backspace => {
            chat.input.pop();
        }
        KeyCode::Tab => chat.emoji_open = !chat.emoji_open,
        KeyCode::Up => chat.scroll = (chat.scroll + 1).min(chat.session.messages().len()),
        KeyCode::Down => chat.scroll = chat.scroll.saturating_sub(1),
        KeyCode::PageUp => chat.scroll = (chat.scroll + 5).min(chat.session.messages().len()),
        KeyCode::PageDown => chat.scroll = chat.scroll.saturating_sub(5),
        KeyCode::Char(c) => {
            if (c as u32) >= 32 {
                chat.input.push(c);
            }
        }
        _ => {}
    }
}

// A failed send keeps the draft; the link line already explains what
// happened and Ctrl+R is the way back.
fn chat_send(chat: &mut ChatWindow) {
    let text = chat.input.trim().to_string();
    if !text.is_empty() && chat.session.send(&text).is_ok() {
        chat.input.clear();
        chat.scroll = 0;
    }
}

fn toggle_login(terminal: &mut Term, state: &mut DesktopState) -> Result<()> {
    if config::get_nickname().is_some() {
        config::set_nickname(None);
        return Ok(());
    }
    prompt_login(terminal)?;
    if config::get_nickname().is_some() {
        // Chat windows stuck on their login field can proceed now.
        for win in &mut state.windows {
            if let WindowKind::Chat(chat) = &mut win.kind {
                if chat.needs_name {
                    chat.needs_name = false;
                    chat.name_error = false;
                    chat.session.connect();
                }
            }
        }
    }
    Ok(())
}

fn prompt_login(terminal: &mut Term) -> Result<()> {
    loop {
        let Some(name) = input_prompt(terminal, "Hello, Stranger!\n\n  Enter your nickname:")?
        else {
            return Ok(());
        };
        if name.is_empty() {
            flash_message(terminal, "Do not leave the field blank!", 1200)?;
            continue;
        }
        config::set_nickname(Some(&name));
        return Ok(());
    }
}

fn handle_mouse(
    terminal: &mut Term,
    state: &mut DesktopState,
    mouse: crossterm::event::MouseEvent,
) -> Result<()> {
    state.cursor_x = mouse.column;
    state.cursor_y = mouse.row;

    let term_size = terminal.size()?;
    let size = full_rect(term_size.width, term_size.height);
    let top = top_status_area(size);
    let desk = desktop_area(size);
    let task = taskbar_area(size);

    if let MouseEventKind::Drag(MouseButton::Left) = mouse.kind {
        drag_window_to(state, mouse.column, mouse.row, desk);
        return Ok(());
    }

    if let MouseEventKind::Up(MouseButton::Left) = mouse.kind {
        state.dragging = None;
        return Ok(());
    }

    if matches!(
        mouse.kind,
        MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
    ) {
        if let Some((window_id, WindowHit::Content)) = hit_window(state, mouse.column, mouse.row) {
            scroll_window(state, window_id, mouse.kind);
        }
        return Ok(());
    }

    if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
        return Ok(());
    }

    if point_in_rect(mouse.column, mouse.row, login_button_rect(top)) {
        toggle_login(terminal, state)?;
        return Ok(());
    }

    let layout = taskbar_layout(state, task);
    if let Some(prev) = layout.prev_rect {
        if point_in_rect(mouse.column, mouse.row, prev) {
            if layout.can_scroll_left {
                state.task_scroll = state.task_scroll.saturating_sub(1);
            }
            return Ok(());
        }
    }
    if let Some(next) = layout.next_rect {
        if point_in_rect(mouse.column, mouse.row, next) {
            if layout.can_scroll_right {
                state.task_scroll =
                    (state.task_scroll + 1).min(state.windows.len().saturating_sub(1));
            }
            return Ok(());
        }
    }
    for btn in layout.buttons {
        if point_in_rect(mouse.column, mouse.row, btn.rect) {
            focus_window(state, btn.window_id);
            return Ok(());
        }
    }

    if let Some((window_id, hit)) = hit_window(state, mouse.column, mouse.row) {
        focus_window(state, window_id);
        match hit {
            WindowHit::Close => close_window_by_id(state, window_id),
            WindowHit::Title => {
                if let Some(win) = state.windows.iter().find(|w| w.id == window_id) {
                    state.dragging = Some(DragState {
                        window_id,
                        dx: i32::from(mouse.column) - win.rect.x,
                        dy: i32::from(mouse.row) - win.rect.y,
                    });
                }
            }
            WindowHit::Content => {
                window_content_click(state, window_id, mouse.column, mouse.row);
            }
        }
        return Ok(());
    }

    if let Some(app) = hit_desktop_icon(mouse.column, mouse.row, desk) {
        spawn_app(state, app, desk);
    }

    Ok(())
}

// Move the dragged window so the grab cell follows the pointer, then
// clamp it back onto the desk.
fn drag_window_to(state: &mut DesktopState, column: u16, row: u16, desk: Rect) {
    let Some(drag) = state.dragging else {
        return;
    };
    let Some(win) = state.windows.iter_mut().find(|w| w.id == drag.window_id) else {
        return;
    };
    win.rect.x = i32::from(column) - drag.dx;
    win.rect.y = i32::from(row) - drag.dy;
    let (min_w, min_h) = window_size_for_kind(&win.kind);
    clamp_window_with_min(&mut win.rect, desk, min_w, min_h);
}

fn scroll_window(state: &mut DesktopState, window_id: u64, kind: MouseEventKind) {
    let Some(win) = state.windows.iter_mut().find(|w| w.id == window_id) else {
        return;
    };
    if let WindowKind::Chat(chat) = &mut win.kind {
        match kind {
            MouseEventKind::ScrollUp => {
                chat.scroll = (chat.scroll + 3).min(chat.session.messages().len());
            }
            MouseEventKind::ScrollDown => chat.scroll = chat.scroll.saturating_sub(3),
            _ => {}
        }
    }
}

fn window_content_click(state: &mut DesktopState, window_id: u64, x: u16, y: u16) {
    let Some(idx) = state.windows.iter().position(|w| w.id == window_id) else {
        return;
    };
    let win = &mut state.windows[idx];
    let inner = inner_rect(win.rect.to_rect());
    if inner.width == 0 || inner.height == 0 {
        return;
    }
    match &mut win.kind {
        WindowKind::Memory(mw) => memory_content_click(mw, &state.scores, inner, x, y),
        WindowKind::Calculation(cw) => calculation_content_click(cw, &state.scores, inner, x, y),
        WindowKind::TicToc(tw) => tictoc_content_click(tw, inner, x, y),
        WindowKind::Chat(chat) => chat_content_click(chat, inner, x, y),
    }
}

fn memory_content_click(mw: &mut MemoryWindow, store: &ScoreStore, inner: Rect, x: u16, y: u16) {
    let buttons = panel_button_rects(inner, &GAME_PANEL);
    if point_in_rect(x, y, buttons[0]) {
        mw.game.restart();
        mw.view = GameView::Board;
        mw.last_second = Instant::now();
        return;
    }
    if point_in_rect(x, y, buttons[1]) {
        if mw.view == GameView::Scores {
            mw.view = GameView::Board;
        } else {
            mw.scorelist = store.list(GAME_MEMORY);
            mw.view = GameView::Scores;
        }
        return;
    }
    if point_in_rect(x, y, buttons[2]) {
        store.reset(GAME_MEMORY);
        mw.scorelist.clear();
        mw.view = GameView::Scores;
        return;
    }
    if mw.view != GameView::Board {
        return;
    }
    if mw.game.is_finished() {
        if point_in_rect(x, y, memory_scorelist_button_rect(inner)) {
            mw.scorelist = store.list(GAME_MEMORY);
            mw.view = GameView::Scores;
        }
        return;
    }
    if let Some(tile) = memory_tile_at(inner, x, y) {
        mw.cursor = tile;
        memory_reveal(mw, store, tile);
    }
}

fn calculation_content_click(
    cw: &mut CalcWindow,
    store: &ScoreStore,
    inner: Rect,
    x: u16,
    y: u16,
) {
    let buttons = panel_button_rects(inner, &GAME_PANEL);
    if point_in_rect(x, y, buttons[0]) {
        // Back to the start screen, as a fresh window would open.
        cw.game = CalculationGame::new();
        cw.input.clear();
        cw.view = GameView::Board;
        return;
    }
    if point_in_rect(x, y, buttons[1]) {
        if cw.view == GameView::Scores {
            cw.view = GameView::Board;
        } else {
            cw.scorelist = store.list(GAME_CALCULATION);
            cw.view = GameView::Scores;
        }
        return;
    }
    if point_in_rect(x, y, buttons[2]) {
        store.reset(GAME_CALCULATION);
        cw.scorelist.clear();
        cw.view = GameView::Scores;
        return;
    }
    if cw.view != GameView::Board {
        return;
    }
    match cw.game.phase() {
        Phase::Idle => {
            if point_in_rect(x, y, calc_start_button_rect(inner)) {
                calc_start(cw);
            }
        }
        Phase::Finished => {
            if point_in_rect(x, y, calc_scorelist_button_rect(inner)) {
                cw.scorelist = store.list(GAME_CALCULATION);
                cw.view = GameView::Scores;
            }
        }
        Phase::Round => {}
    }
}

fn tictoc_content_click(tw: &mut TicTocWindow, inner: Rect, x: u16, y: u16) {
    let buttons = panel_button_rects(inner, &GAME_PANEL[..1]);
    if point_in_rect(x, y, buttons[0]) {
        tw.game.restart();
        return;
    }
    if let Some(cell) = tictoc_cell_at(inner, x, y) {
        tw.cursor = cell;
        tw.game.play(cell);
    }
}

fn chat_content_click(chat: &mut ChatWindow, inner: Rect, x: u16, y: u16) {
    if chat.needs_name {
        return;
    }
    if point_in_rect(x, y, chat_emoji_button_rect(inner)) {
        chat.emoji_open = !chat.emoji_open;
        return;
    }
    if point_in_rect(x, y, chat_send_button_rect(inner)) {
        chat_send(chat);
        return;
    }
    if chat.emoji_open {
        if let Some(emoji) = emoji_at(inner, x, y) {
            chat.input.push_str(emoji);
            chat.emoji_open = false;
        }
    }
}

fn spawn_app(state: &mut DesktopState, app: AppLaunch, desk: Rect) {
    let (w, h) = window_size_for_app(app);
    let slot = state.registry.next_slot();
    let mut rect = cascade_rect(slot, desk, w, h);
    clamp_window_with_min(&mut rect, desk, w, h);

    let kind = match app {
        AppLaunch::Memory => WindowKind::Memory(MemoryWindow::new()),
        AppLaunch::Calculation => WindowKind::Calculation(CalcWindow::new()),
        AppLaunch::TicToc => WindowKind::TicToc(TicTocWindow::new()),
        AppLaunch::Chat => WindowKind::Chat(ChatWindow::open()),
    };
    let id = state.next_id;
    state.next_id += 1;
    let z = state.registry.next_priority();
    state.windows.push(DesktopWindow {
        id,
        title: app_title(app).to_string(),
        rect,
        z,
        kind,
    });
}

fn cascade_rect(slot: CascadeSlot, desk: Rect, w: u16, h: u16) -> WinRect {
    let x = i32::from(desk.x) + i32::from(slot.dx);
    let y = match slot.anchor {
        BandAnchor::Top => i32::from(desk.y) + i32::from(slot.dy),
        BandAnchor::Bottom => {
            i32::from(desk.y) + i32::from(desk.height) - i32::from(slot.dy) - i32::from(h)
        }
    };
    WinRect { x, y, w, h }
}

// Every focus draws a fresh priority, so the stack order falls out of a
// plain sort over z and the taskbar keeps the spawn order untouched.
fn focus_window(state: &mut DesktopState, id: u64) {
    if let Some(win) = state.windows.iter_mut().find(|w| w.id == id) {
        win.z = state.registry.next_priority();
    }
}

fn focused_window_id(state: &DesktopState) -> Option<u64> {
    state.windows.iter().max_by_key(|w| w.z).map(|w| w.id)
}

fn close_window_by_id(state: &mut DesktopState, window_id: u64) {
    if let Some(pos) = state.windows.iter().position(|w| w.id == window_id) {
        let removed = state.windows.remove(pos);
        if let WindowKind::Chat(chat) = &removed.kind {
            chat.session.close();
        }
    }
}

fn shutdown_sessions(state: &DesktopState) {
    for win in &state.windows {
        if let WindowKind::Chat(chat) = &win.kind {
            chat.session.close();
        }
    }
}

fn clamp_all_windows(state: &mut DesktopState, desk: Rect) {
    for win in &mut state.windows {
        let (min_w, min_h) = window_size_for_kind(&win.kind);
        clamp_window_with_min(&mut win.rect, desk, min_w, min_h);
    }
}

fn clamp_window_with_min(rect: &mut WinRect, desk: Rect, min_w: u16, min_h: u16) {
    if desk.width < 8 || desk.height < 4 {
        return;
    }
    let max_w = desk.width.saturating_sub(1).max(1);
    let max_h = desk.height.saturating_sub(1).max(1);
    let min_w_eff = min_w.min(max_w).max(1);
    let min_h_eff = min_h.min(max_h).max(1);

    rect.w = rect.w.min(max_w).max(min_w_eff);
    rect.h = rect.h.min(max_h).max(min_h_eff);

    let min_x = desk.x as i32;
    let min_y = desk.y as i32;
    let max_x = desk
        .x
        .saturating_add(desk.width)
        .saturating_sub(rect.w)
        .saturating_sub(1) as i32;
    let max_y = desk
        .y
        .saturating_add(desk.height)
        .saturating_sub(rect.h)
        .saturating_sub(1) as i32;

    rect.x = rect.x.clamp(min_x, max_x.max(min_x));
    rect.y = rect.y.clamp(min_y, max_y.max(min_y));
}

fn draw_desktop(terminal: &mut Term, state: &mut DesktopState) -> Result<()> {
    let ts = terminal.size()?;
    let size = full_rect(ts.width, ts.height);
    clamp_all_windows(state, desktop_area(size));
    state.task_scroll = state.task_scroll.min(state.windows.len().saturating_sub(1));

    terminal.draw(|f| {
        let size = f.area();
        let top = top_status_area(size);
        let desktop = desktop_area(size);
        let task = taskbar_area(size);

        // Repaint from scratch; cells left by a closed or moved window
        // must not survive into this frame.
        f.render_widget(Clear, size);

        render_status_bar(f, top);
        draw_desktop_background(f, desktop);
        draw_taskbar(f, state, task);

        let focused = focused_window_id(state);
        let mut order: Vec<&DesktopWindow> = state.windows.iter().collect();
        order.sort_by_key(|w| w.z);
        for win in order {
            draw_window(f, win, Some(win.id) == focused);
        }

        draw_cursor(f, state.cursor_x, state.cursor_y, size);
    })?;
    Ok(())
}

fn draw_desktop_background(f: &mut ratatui::Frame, area: Rect) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let mut lines = Vec::new();
    for _ in 0..area.height {
        lines.push(Line::from(Span::styled(
            " ".repeat(area.width as usize),
            normal_style(),
        )));
    }
    f.render_widget(Paragraph::new(lines), area);

    for (idx, (_, badge, label)) in DESKTOP_ICONS.iter().enumerate() {
        let icon = desktop_icon_rect(idx, area);
        if icon.height == 0 || icon.width == 0 {
            continue;
        }
        let icon_lines = vec![
            Line::from(Span::styled(format!(" {badge} "), title_style())),
            Line::from(Span::styled(*label, normal_style())),
        ];
        f.render_widget(Paragraph::new(icon_lines), icon);
    }
}

fn draw_taskbar(f: &mut ratatui::Frame, state: &DesktopState, area: Rect) {
    if area.height == 0 {
        return;
    }
    let width = area.width as usize;
    if width == 0 {
        return;
    }

    let mut row = vec![' '; width];
    let layout = taskbar_layout(state, area);
    if let Some(prev) = layout.prev_rect {
        let text = if layout.can_scroll_left {
            TASK_PAGER_PREV
        } else {
            "   "
        };
        write_text_in_area(&mut row, area, prev.x, text);
    }
    if let Some(next) = layout.next_rect {
        let text = if layout.can_scroll_right {
            TASK_PAGER_NEXT
        } else {
            "   "
        };
        write_text_in_area(&mut row, area, next.x, text);
    }
    for btn in layout.buttons {
        if let Some(win) = state.windows.iter().find(|w| w.id == btn.window_id) {
            write_text_in_area(&mut row, area, btn.rect.x, &task_button_text(win));
        }
    }

    let line: String = row.into_iter().collect();
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(line, sel_style()))),
        area,
    );
}

fn draw_window(f: &mut ratatui::Frame, win: &DesktopWindow, focused: bool) {
    let area = win.rect.to_rect();
    if area.width < 8 || area.height < 4 {
        return;
    }

    // The frame is opaque over whatever sits beneath it.
    f.render_widget(Clear, area);

    let border_style = if focused { title_style() } else { dim_style() };
    f.render_widget(
        Block::default().borders(Borders::ALL).style(border_style),
        area,
    );

    let title_color = if focused { sel_style() } else { dim_style() };
    let mut chars: Vec<char> = vec![' '; area.width.saturating_sub(2) as usize];
    write_text(&mut chars, 0, &format!(" {} ", win.title));
    if chars.len() >= TITLE_CLOSE_BUTTON.len() {
        let button_x = chars.len() - TITLE_CLOSE_BUTTON.len();
        write_text(&mut chars, button_x, TITLE_CLOSE_BUTTON);
    }
    let title_line: String = chars.into_iter().collect();
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(title_line, title_color))),
        Rect {
            x: area.x + 1,
            y: area.y,
            width: area.width - 2,
            height: 1,
        },
    );

    match &win.kind {
        WindowKind::Memory(mw) => draw_memory_window(f, area, mw, focused),
        WindowKind::Calculation(cw) => draw_calculation_window(f, area, cw),
        WindowKind::TicToc(tw) => draw_tictoc_window(f, area, tw, focused),
        WindowKind::Chat(chat) => draw_chat_window(f, area, chat, focused),
    }
}

fn draw_memory_window(f: &mut ratatui::Frame, area: Rect, mw: &MemoryWindow, focused: bool) {
    let inner = inner_rect(area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    draw_panel_row(f, inner, &GAME_PANEL);

    if mw.view == GameView::Scores {
        draw_scorelist(f, inner, &mw.scorelist);
        return;
    }

    for grid_row in 0..4usize {
        let Some(row) = content_row(inner, 2 + (grid_row as u16) * 2) else {
            break;
        };
        let mut spans = vec![Span::styled(" ".to_string(), normal_style())];
        for col in 0..4usize {
            let tile = grid_row * 4 + col;
            let (text, style) = memory_tile_span(mw, tile, focused);
            spans.push(Span::styled(text, style));
            if col < 3 {
                spans.push(Span::styled(" ".to_string(), normal_style()));
            }
        }
        f.render_widget(Paragraph::new(Line::from(spans)), row);
    }

    if mw.game.is_finished() {
        let lines = [
            (10u16, "All pairs are matched!".to_string(), title_style()),
            (11, format!("Your score is {}!", mw.game.score()), normal_style()),
            (12, BTN_SCORELIST.to_string(), sel_style()),
        ];
        for (dy, text, style) in lines {
            if let Some(row) = content_row(inner, dy) {
                f.render_widget(Paragraph::new(Span::styled(format!(" {text}"), style)), row);
            }
        }
    } else {
        if let Some(row) = content_row(inner, 10) {
            f.render_widget(
                Paragraph::new(Span::styled(
                    format!(" Total tries: {}", mw.game.clicks()),
                    normal_style(),
                )),
                row,
            );
        }
        if let Some(row) = content_row(inner, 11) {
            f.render_widget(
                Paragraph::new(Span::styled(
                    format!(" Total sec: {}", mw.game.elapsed_seconds()),
                    normal_style(),
                )),
                row,
            );
        }
    }
}

fn memory_tile_span(mw: &MemoryWindow, tile: usize, focused: bool) -> (String, Style) {
    let cursor_here = focused && mw.cursor == tile && !mw.game.is_finished();
    let (open, close) = if cursor_here { ('<', '>') } else { ('[', ']') };
    match mw.game.face(tile) {
        TileFace::Hidden => (format!("{open} ? {close}"), normal_style()),
        TileFace::FaceUp => (format!("{open} {} {close}", mw.game.value(tile)), sel_style()),
        TileFace::Matched => (format!("  {}  ", mw.game.value(tile)), dim_style()),
    }
}

fn draw_calculation_window(f: &mut ratatui::Frame, area: Rect, cw: &CalcWindow) {
    let inner = inner_rect(area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    draw_panel_row(f, inner, &GAME_PANEL);

    if cw.view == GameView::Scores {
        draw_scorelist(f, inner, &cw.scorelist);
        return;
    }

    let mut lines: Vec<(u16, String, Style)> = Vec::new();
    match cw.game.phase() {
        Phase::Idle => {
            lines.push((2, format!("Player: {}", display_name()), normal_style()));
            lines.push((4, BTN_START.to_string(), sel_style()));
        }
        Phase::Round => {
            lines.push((2, format!("Go Go, {}!", display_name()), normal_style()));
            if let Some(eq) = cw.game.equation() {
                lines.push((
                    4,
                    format!("{} {} {} = {}█", eq.a, eq.op.symbol(), eq.b, cw.input),
                    title_style(),
                ));
            }
            lines.push((
                6,
                format!(
                    "Round {} of {}   Time left: {}s",
                    cw.game.round() + 1,
                    ROUNDS,
                    cw.game.remaining_seconds()
                ),
                normal_style(),
            ));
            if let Some(fb) = cw.game.feedback() {
                let (text, style) = if fb.correct {
                    ("That was correct!".to_string(), title_style())
                } else {
                    (
                        format!("Incorrect, the right answer was {}", fb.expected),
                        normal_style(),
                    )
                };
                lines.push((8, text, style));
            }
        }
        Phase::Finished => {
            lines.push((2, format!("Game over, {}!", display_name()), title_style()));
            lines.push((
                4,
                format!(
                    "Score: {}   Seconds: {}",
                    cw.game.current_score(),
                    cw.game.total_seconds()
                ),
                normal_style(),
            ));
            lines.push((6, format!("Total score: {}", cw.game.total_score()), normal_style()));
            lines.push((8, BTN_SCORELIST.to_string(), sel_style()));
        }
    }
    for (dy, text, style) in lines {
        if let Some(row) = content_row(inner, dy) {
            f.render_widget(Paragraph::new(Span::styled(format!(" {text}"), style)), row);
        }
    }
}

fn draw_tictoc_window(f: &mut ratatui::Frame, area: Rect, tw: &TicTocWindow, focused: bool) {
    let inner = inner_rect(area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    draw_panel_row(f, inner, &GAME_PANEL[..1]);

    for grid_row in 0..3usize {
        let dy = 2 + (grid_row as u16) * 2;
        if let Some(row) = content_row(inner, dy) {
            let mut spans = vec![Span::styled(" ".to_string(), normal_style())];
            for col in 0..3usize {
                let cell = grid_row * 3 + col;
                let (text, style) = tictoc_cell_span(tw, cell, focused);
                spans.push(Span::styled(text, style));
                if col < 2 {
                    spans.push(Span::styled("|".to_string(), dim_style()));
                }
            }
            f.render_widget(Paragraph::new(Line::from(spans)), row);
        }
        if grid_row < 2 {
            if let Some(row) = content_row(inner, dy + 1) {
                f.render_widget(
                    Paragraph::new(Span::styled(" ---+---+---".to_string(), dim_style())),
                    row,
                );
            }
        }
    }

    if let Some(row) = content_row(inner, 8) {
        let (text, style) = match tw.game.outcome() {
            Some(Outcome::Won { mark, .. }) => {
                (format!("{} wins the game!", mark.symbol()), title_style())
            }
            Some(Outcome::Draw) => ("A draw.".to_string(), title_style()),
            None => (format!("{} to move", tw.game.next_mark().symbol()), normal_style()),
        };
        f.render_widget(Paragraph::new(Span::styled(format!(" {text}"), style)), row);
    }
}

fn tictoc_cell_span(tw: &TicTocWindow, cell: usize, focused: bool) -> (String, Style) {
    let glyph = tw.game.cell(cell).map(|m| m.symbol()).unwrap_or(' ');
    let text = if focused && tw.cursor == cell && !tw.game.is_over() {
        format!(">{glyph}<")
    } else {
        format!(" {glyph} ")
    };
    let style = match tw.game.outcome() {
        Some(Outcome::Won { line, .. }) if line.contains(&cell) => sel_style(),
        _ => normal_style(),
    };
    (text, style)
}

fn draw_chat_window(f: &mut ratatui::Frame, area: Rect, chat: &ChatWindow, focused: bool) {
    let inner = inner_rect(area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    if chat.needs_name {
        draw_chat_login(f, inner, chat);
        return;
    }

    let channel = chat
        .session
        .channel_heard()
        .unwrap_or_else(|| get_settings().chat.channel);
    if let Some(row) = content_row(inner, 0) {
        f.render_widget(
            Paragraph::new(Span::styled(
                truncate_row(&format!(" You are currently listening to {channel}"), inner.width),
                dim_style(),
            )),
            row,
        );
    }
    if let Some(row) = content_row(inner, 1) {
        f.render_widget(
            Paragraph::new(Span::styled(
                truncate_row(&format!(" {}", link_line(&chat.session.status())), inner.width),
                normal_style(),
            )),
            row,
        );
    }
    if let Some(row) = content_row(inner, 2) {
        f.render_widget(
            Paragraph::new(Span::styled(
                "-".repeat(inner.width as usize),
                dim_style(),
            )),
            row,
        );
    }

    let input_dy = inner.height - 1;
    let palette_rows: u16 = if chat.emoji_open { 2 } else { 0 };
    let msg_top: u16 = 3;
    let msg_rows = input_dy.saturating_sub(msg_top).saturating_sub(palette_rows) as usize;

    let msgs = chat.session.messages();
    let scroll = chat.scroll.min(msgs.len().saturating_sub(msg_rows));
    let end = msgs.len() - scroll;
    let start = end.saturating_sub(msg_rows);
    let shown = &msgs[start..end];
    let first_dy = msg_top + (msg_rows - shown.len()) as u16;
    for (i, msg) in shown.iter().enumerate() {
        if let Some(row) = content_row(inner, first_dy + i as u16) {
            let text = format!("{} {}: {}", msg.stamp, msg.username, msg.text);
            f.render_widget(
                Paragraph::new(Span::styled(truncate_row(&text, inner.width), normal_style())),
                row,
            );
        }
    }

    if chat.emoji_open {
        draw_emoji_palette(f, inner);
    }

    draw_chat_input(f, inner, chat, focused);
}

fn draw_chat_login(f: &mut ratatui::Frame, inner: Rect, chat: &ChatWindow) {
    let rows = [
        (1u16, "Hello, Stranger!".to_string(), title_style()),
        (3, "Enter your nickname:".to_string(), normal_style()),
        (5, format!("> {}█", chat.name_input), normal_style()),
    ];
    for (dy, text, style) in rows {
        if let Some(row) = content_row(inner, dy) {
            f.render_widget(
                Paragraph::new(Span::styled(
                    truncate_row(&format!(" {text}"), inner.width),
                    style,
                )),
                row,
            );
        }
    }
    if chat.name_error {
        if let Some(row) = content_row(inner, 7) {
            f.render_widget(
                Paragraph::new(Span::styled(
                    " Do not leave the field blank!".to_string(),
                    sel_style(),
                )),
                row,
            );
        }
    }
}

fn draw_chat_input(f: &mut ratatui::Frame, inner: Rect, chat: &ChatWindow, focused: bool) {
    let Some(row) = content_row(inner, inner.height - 1) else {
        return;
    };
    let buttons_w = (CHAT_EMOJI_BUTTON.len() + 1 + CHAT_SEND_BUTTON.len()) as u16;
    let field_w = inner.width.saturating_sub(buttons_w.saturating_add(1)) as usize;
    let tail = tail_chars(&chat.input, field_w.saturating_sub(3));
    let left = format!("> {tail}█");
    let pad = inner
        .width
        .saturating_sub(left.chars().count() as u16)
        .saturating_sub(buttons_w);
    let line = Line::from(vec![
        Span::styled(left, if focused { normal_style() } else { dim_style() }),
        Span::styled(" ".repeat(pad as usize), normal_style()),
        Span::styled(CHAT_EMOJI_BUTTON, sel_style()),
        Span::styled(" ", normal_style()),
        Span::styled(CHAT_SEND_BUTTON, sel_style()),
    ]);
    f.render_widget(Paragraph::new(line), row);
}

fn draw_emoji_palette(f: &mut ratatui::Frame, inner: Rect) {
    let palette = emoji_palette_rect(inner);
    for r in 0..2usize {
        let mut spans = Vec::new();
        for c in 0..EMOJI_COLS {
            let Some(e) = EMOJI.get(r * EMOJI_COLS + c) else {
                break;
            };
            spans.push(Span::styled(format!("{e} "), normal_style()));
        }
        f.render_widget(
            Paragraph::new(Line::from(spans)),
            Rect {
                x: palette.x,
                y: palette.y + r as u16,
                width: palette.width,
                height: 1,
            },
        );
    }
}

fn link_line(status: &LinkStatus) -> String {
    match status {
        LinkStatus::Offline => "Link: offline".to_string(),
        LinkStatus::Connecting => "Link: dialing...".to_string(),
        LinkStatus::Online => "Link: online".to_string(),
        LinkStatus::Dropped(reason) => format!("Link: dropped ({reason}); Ctrl+R redials"),
    }
}

fn draw_panel_row(f: &mut ratatui::Frame, inner: Rect, labels: &[&str]) {
    let Some(row) = content_row(inner, 0) else {
        return;
    };
    let mut spans = vec![Span::styled(" ".to_string(), normal_style())];
    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" ".to_string(), normal_style()));
        }
        spans.push(Span::styled((*label).to_string(), sel_style()));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), row);
}

fn draw_scorelist(f: &mut ratatui::Frame, inner: Rect, list: &[ScoreEntry]) {
    if let Some(row) = content_row(inner, 2) {
        f.render_widget(
            Paragraph::new(Span::styled(
                format!(" {:<20} {:>6}", "Player", "Score"),
                title_style(),
            )),
            row,
        );
    }
    if list.is_empty() {
        if let Some(row) = content_row(inner, 4) {
            f.render_widget(
                Paragraph::new(Span::styled(" No scores yet.".to_string(), dim_style())),
                row,
            );
        }
        return;
    }
    for (i, entry) in list.iter().enumerate() {
        let Some(row) = content_row(inner, 4 + i as u16) else {
            break;
        };
        let name: String = entry.name.chars().take(20).collect();
        f.render_widget(
            Paragraph::new(Span::styled(
                format!(" {:<20} {:>6}", name, entry.score),
                normal_style(),
            )),
            row,
        );
    }
}

fn draw_cursor(f: &mut ratatui::Frame, x: u16, y: u16, size: Rect) {
    if x >= size.width || y >= size.height {
        return;
    }
    f.render_widget(
        Paragraph::new(Line::from(Span::styled("+", sel_style()))),
        Rect {
            x,
            y,
            width: 1,
            height: 1,
        },
    );
}

fn task_button_text(win: &DesktopWindow) -> String {
    let mut label = win.title.clone();
    if label.len() > 16 {
        label.truncate(16);
    }
    format!("[{label}]")
}

fn taskbar_layout(state: &DesktopState, task: Rect) -> TaskbarLayout {
    if task.height == 0 || task.width == 0 {
        return TaskbarLayout::empty();
    }

    let mut layout = TaskbarLayout::empty();
    let task_x_end = task.x.saturating_add(task.width);
    let base_x = task.x.saturating_add(1);
    if base_x >= task_x_end {
        return layout;
    }

    let labels: Vec<(u64, String)> = state
        .windows
        .iter()
        .map(|w| (w.id, task_button_text(w)))
        .collect();
    if labels.is_empty() {
        return layout;
    }

    let content_width = task.width.saturating_sub(1) as usize;
    let total_needed: usize = labels.iter().map(|(_, t)| t.len() + 1).sum();
    let scroll = state.task_scroll.min(labels.len().saturating_sub(1));
    let paging = total_needed > content_width || scroll > 0;

    if !paging {
        let mut x = base_x;
        for (window_id, text) in labels {
            let width = text.len() as u16;
            if x + width >= task_x_end {
                break;
            }
            layout.buttons.push(TaskButton {
                window_id,
                rect: Rect {
                    x,
                    y: task.y,
                    width,
                    height: 1,
                },
            });
            x = x.saturating_add(width).saturating_add(1);
        }
        return layout;
    }

    let pager_w = TASK_PAGER_PREV.len() as u16;
    let prev_rect = Rect {
        x: base_x,
        y: task.y,
        width: pager_w,
        height: 1,
    };
    let next_rect = Rect {
        x: task_x_end.saturating_sub(pager_w),
        y: task.y,
        width: pager_w,
        height: 1,
    };
    if prev_rect.x.saturating_add(prev_rect.width) >= next_rect.x {
        return layout;
    }
    layout.prev_rect = Some(prev_rect);
    layout.next_rect = Some(next_rect);

    let mut x = prev_rect
        .x
        .saturating_add(prev_rect.width)
        .saturating_add(1);
    let max_x = next_rect.x.saturating_sub(1);
    let mut idx = scroll;
    while idx < labels.len() {
        let (window_id, text) = &labels[idx];
        let width = text.len() as u16;
        if width == 0 || x + width > max_x {
            break;
        }
        layout.buttons.push(TaskButton {
            window_id: *window_id,
            rect: Rect {
                x,
                y: task.y,
                width,
                height: 1,
            },
        });
        x = x.saturating_add(width).saturating_add(1);
        idx += 1;
    }

    layout.can_scroll_left = scroll > 0;
    layout.can_scroll_right = idx < labels.len();
    layout
}

fn top_status_area(size: Rect) -> Rect {
    Rect {
        x: size.x,
        y: size.y,
        width: size.width,
        height: if size.height > 0 { 1 } else { 0 },
    }
}

fn full_rect(width: u16, height: u16) -> Rect {
    Rect {
        x: 0,
        y: 0,
        width,
        height,
    }
}

fn taskbar_area(size: Rect) -> Rect {
    Rect {
        x: size.x,
        y: size.y + size.height.saturating_sub(1),
        width: size.width,
        height: if size.height > 1 { 1 } else { 0 },
    }
}

fn desktop_area(size: Rect) -> Rect {
    let top = if size.height > 0 { 1 } else { 0 };
    let bottom = if size.height > 1 { 1 } else { 0 };
    Rect {
        x: size.x,
        y: size.y + top,
        width: size.width,
        height: size.height.saturating_sub(top + bottom),
    }
}

fn inner_rect(area: Rect) -> Rect {
    Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}

fn content_row(inner: Rect, dy: u16) -> Option<Rect> {
    if dy >= inner.height {
        return None;
    }
    Some(Rect {
        x: inner.x,
        y: inner.y + dy,
        width: inner.width,
        height: 1,
    })
}

fn title_close_button_rect(area: Rect) -> Rect {
    Rect {
        x: area.x
            + area
                .width
                .saturating_sub(TITLE_CLOSE_BUTTON.len() as u16 + 1),
        y: area.y,
        width: TITLE_CLOSE_BUTTON.len() as u16,
        height: 1,
    }
}

fn desktop_icon_rect(idx: usize, desk: Rect) -> Rect {
    let y = desk.y + 1 + (idx as u16) * 3;
    let fits = y + 2 <= desk.y + desk.height;
    Rect {
        x: desk.x + 2,
        y,
        width: 12.min(desk.width.saturating_sub(2)),
        height: if fits { 2 } else { 0 },
    }
}

fn hit_desktop_icon(x: u16, y: u16, desk: Rect) -> Option<AppLaunch> {
    for (idx, (app, _, _)) in DESKTOP_ICONS.iter().enumerate() {
        if point_in_rect(x, y, desktop_icon_rect(idx, desk)) {
            return Some(*app);
        }
    }
    None
}

fn hit_window(state: &DesktopState, x: u16, y: u16) -> Option<(u64, WindowHit)> {
    let mut order: Vec<&DesktopWindow> = state.windows.iter().collect();
    order.sort_by_key(|w| Reverse(w.z));
    for win in order {
        let rect = win.rect;
        if !rect.contains(x, y) {
            continue;
        }
        let area = rect.to_rect();
        if point_in_rect(x, y, title_close_button_rect(area)) {
            return Some((win.id, WindowHit::Close));
        }
        if y == area.y {
            return Some((win.id, WindowHit::Title));
        }
        return Some((win.id, WindowHit::Content));
    }
    None
}

fn panel_button_rects(inner: Rect, labels: &[&str]) -> Vec<Rect> {
    let mut rects = Vec::new();
    let mut x = inner.x + 1;
    for label in labels {
        let w = label.len() as u16;
        rects.push(Rect {
            x,
            y: inner.y,
            width: w,
            height: 1,
        });
        x = x.saturating_add(w).saturating_add(1);
    }
    rects
}

fn memory_tile_at(inner: Rect, x: u16, y: u16) -> Option<usize> {
    let gx = inner.x + 1;
    let gy = inner.y + 2;
    if x < gx || y < gy {
        return None;
    }
    let dx = x - gx;
    let dy = y - gy;
    if dy % 2 != 0 || dx % 6 >= 5 {
        return None;
    }
    let row = (dy / 2) as usize;
    let col = (dx / 6) as usize;
    if row >= 4 || col >= 4 {
        return None;
    }
    Some(row * 4 + col)
}

fn tictoc_cell_at(inner: Rect, x: u16, y: u16) -> Option<usize> {
    let gx = inner.x + 1;
    let gy = inner.y + 2;
    if x < gx || y < gy {
        return None;
    }
    let dx = x - gx;
    let dy = y - gy;
    if dy % 2 != 0 || dx % 4 == 3 {
        return None;
    }
    let row = (dy / 2) as usize;
    let col = (dx / 4) as usize;
    if row >= 3 || col >= 3 {
        return None;
    }
    Some(row * 3 + col)
}

fn memory_scorelist_button_rect(inner: Rect) -> Rect {
    Rect {
        x: inner.x + 1,
        y: inner.y + 12,
        width: BTN_SCORELIST.len() as u16,
        height: 1,
    }
}

fn calc_start_button_rect(inner: Rect) -> Rect {
    Rect {
        x: inner.x + 1,
        y: inner.y + 4,
        width: BTN_START.len() as u16,
        height: 1,
    }
}

fn calc_scorelist_button_rect(inner: Rect) -> Rect {
    Rect {
        x: inner.x + 1,
        y: inner.y + 8,
        width: BTN_SCORELIST.len() as u16,
        height: 1,
    }
}

fn chat_emoji_button_rect(inner: Rect) -> Rect {
    Rect {
        x: inner.x + inner.width.saturating_sub(11),
        y: inner.y + inner.height.saturating_sub(1),
        width: CHAT_EMOJI_BUTTON.len() as u16,
        height: 1,
    }
}

fn chat_send_button_rect(inner: Rect) -> Rect {
    Rect {
        x: inner.x + inner.width.saturating_sub(CHAT_SEND_BUTTON.len() as u16),
        y: inner.y + inner.height.saturating_sub(1),
        width: CHAT_SEND_BUTTON.len() as u16,
        height: 1,
    }
}

fn emoji_palette_rect(inner: Rect) -> Rect {
    Rect {
        x: inner.x + 1,
        y: (inner.y + inner.height).saturating_sub(3),
        width: ((EMOJI_COLS * 3) as u16).min(inner.width.saturating_sub(1)),
        height: 2,
    }
}

fn emoji_at(inner: Rect, x: u16, y: u16) -> Option<&'static str> {
    let palette = emoji_palette_rect(inner);
    if !point_in_rect(x, y, palette) {
        return None;
    }
    let dx = x - palette.x;
    if dx % 3 == 2 {
        return None;
    }
    let col = (dx / 3) as usize;
    let row = (y - palette.y) as usize;
    EMOJI.get(row * EMOJI_COLS + col).copied()
}

fn point_in_rect(x: u16, y: u16, r: Rect) -> bool {
    x >= r.x && x < r.x.saturating_add(r.width) && y >= r.y && y < r.y.saturating_add(r.height)
}

fn truncate_row(text: &str, width: u16) -> String {
    text.chars().take(width as usize).collect()
}

fn tail_chars(text: &str, keep: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(keep)).collect()
}

fn write_text(buf: &mut [char], start: usize, text: &str) {
    for (i, ch) in text.chars().enumerate() {
        let idx = start + i;
        if idx >= buf.len() {
            break;
        }
        buf[idx] = ch;
    }
}

fn write_text_in_area(buf: &mut [char], area: Rect, x: u16, text: &str) {
    if x < area.x {
        return;
    }
    let start = (x - area.x) as usize;
    write_text(buf, start, text);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowHit {
    Title,
    Close,
    Content,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::cascade_slot;

    fn test_state() -> DesktopState {
        DesktopState::new(ScoreStore::at(std::env::temp_dir()))
    }

    fn test_desk() -> Rect {
        desktop_area(full_rect(100, 40))
    }

    #[test]
    fn spawns_walk_down_the_cascade_diagonal() {
        let mut state = test_state();
        let desk = test_desk();
        spawn_app(&mut state, AppLaunch::Memory, desk);
        spawn_app(&mut state, AppLaunch::Memory, desk);
        let first = state.windows[0].rect;
        let second = state.windows[1].rect;
        assert_eq!((first.x, first.y), (i32::from(desk.x), i32::from(desk.y)));
        assert_eq!((second.x, second.y), (first.x + 2, first.y + 1));
    }

    #[test]
    fn focusing_an_older_window_raises_it_to_the_top() {
        let mut state = test_state();
        let desk = test_desk();
        spawn_app(&mut state, AppLaunch::TicToc, desk);
        spawn_app(&mut state, AppLaunch::TicToc, desk);
        spawn_app(&mut state, AppLaunch::TicToc, desk);
        let first = state.windows[0].id;
        assert_ne!(focused_window_id(&state), Some(first));
        focus_window(&mut state, first);
        assert_eq!(focused_window_id(&state), Some(first));
        // The taskbar keeps the spawn order even after a refocus.
        assert_eq!(state.windows[0].id, first);
    }

    #[test]
    fn hit_test_picks_the_topmost_window_and_its_regions() {
        let mut state = test_state();
        let desk = test_desk();
        spawn_app(&mut state, AppLaunch::TicToc, desk);
        spawn_app(&mut state, AppLaunch::TicToc, desk);
        let top_id = state.windows[1].id;
        let area = state.windows[1].rect.to_rect();

        let (id, hit) = hit_window(&state, area.x + 4, area.y + 2).unwrap();
        assert_eq!(id, top_id);
        assert_eq!(hit, WindowHit::Content);

        let (id, hit) = hit_window(&state, area.x + 4, area.y).unwrap();
        assert_eq!(id, top_id);
        assert_eq!(hit, WindowHit::Title);

        let close = title_close_button_rect(area);
        let (id, hit) = hit_window(&state, close.x, close.y).unwrap();
        assert_eq!(id, top_id);
        assert_eq!(hit, WindowHit::Close);
    }

    #[test]
    fn cascade_rects_anchor_to_both_desk_edges() {
        let desk = Rect {
            x: 0,
            y: 1,
            width: 100,
            height: 38,
        };
        let top = cascade_rect(cascade_slot(0), desk, 30, 10);
        assert_eq!((top.x, top.y), (0, 1));
        // Launch 20 opens the bottom band; dy counts up from the lower edge.
        let bottom = cascade_rect(cascade_slot(20), desk, 30, 10);
        assert_eq!(bottom.x, 40);
        assert_eq!(bottom.y, 1 + 38 - 10);
        let deeper = cascade_rect(cascade_slot(21), desk, 30, 10);
        assert_eq!(deeper.y, bottom.y - 1);
    }

    #[test]
    fn memory_tiles_map_from_click_positions() {
        let inner = Rect {
            x: 5,
            y: 3,
            width: 35,
            height: 13,
        };
        assert_eq!(memory_tile_at(inner, 6, 5), Some(0));
        assert_eq!(memory_tile_at(inner, 10, 5), Some(0));
        assert_eq!(memory_tile_at(inner, 11, 5), None);
        assert_eq!(memory_tile_at(inner, 12, 5), Some(1));
        assert_eq!(memory_tile_at(inner, 6, 6), None);
        assert_eq!(memory_tile_at(inner, 12, 7), Some(5));
        assert_eq!(memory_tile_at(inner, 6, 11), Some(12));
        assert_eq!(memory_tile_at(inner, 30, 5), None);
    }

    #[test]
    fn tictoc_cells_map_from_click_positions() {
        let inner = Rect {
            x: 2,
            y: 2,
            width: 18,
            height: 10,
        };
        assert_eq!(tictoc_cell_at(inner, 3, 4), Some(0));
        assert_eq!(tictoc_cell_at(inner, 5, 4), Some(0));
        assert_eq!(tictoc_cell_at(inner, 6, 4), None);
        assert_eq!(tictoc_cell_at(inner, 7, 4), Some(1));
        assert_eq!(tictoc_cell_at(inner, 3, 5), None);
        assert_eq!(tictoc_cell_at(inner, 11, 8), Some(8));
    }

    #[test]
    fn taskbar_pages_when_buttons_overflow() {
        let mut state = test_state();
        let desk = test_desk();
        spawn_app(&mut state, AppLaunch::TicToc, desk);
        let narrow = Rect {
            x: 0,
            y: 39,
            width: 30,
            height: 1,
        };
        let layout = taskbar_layout(&state, narrow);
        assert!(layout.prev_rect.is_none());
        assert_eq!(layout.buttons.len(), 1);

        spawn_app(&mut state, AppLaunch::TicToc, desk);
        spawn_app(&mut state, AppLaunch::TicToc, desk);
        spawn_app(&mut state, AppLaunch::TicToc, desk);
        let layout = taskbar_layout(&state, narrow);
        assert!(layout.prev_rect.is_some() && layout.next_rect.is_some());
        assert!(layout.can_scroll_right);
        assert!(!layout.can_scroll_left);
    }

    #[test]
    fn drag_keeps_windows_inside_the_desk() {
        let mut state = test_state();
        let desk = test_desk();
        spawn_app(&mut state, AppLaunch::TicToc, desk);
        let id = state.windows[0].id;
        // Grabbed two cells in from the title row's left corner.
        state.dragging = Some(DragState {
            window_id: id,
            dx: 2,
            dy: 0,
        });

        // Past the bottom-right corner: the window stops a cell short of
        // the desk edges.
        drag_window_to(&mut state, 99, 39, desk);
        let rect = state.windows[0].rect;
        assert_eq!(rect.x, i32::from(desk.x + desk.width - rect.w - 1));
        assert_eq!(rect.y, i32::from(desk.y + desk.height - rect.h - 1));

        // Past the top-left corner: the raw position goes negative and is
        // pulled back to the desk origin.
        drag_window_to(&mut state, 0, 0, desk);
        let rect = state.windows[0].rect;
        assert_eq!((rect.x, rect.y), (i32::from(desk.x), i32::from(desk.y)));

        // In bounds, the grab cell lands back under the pointer.
        drag_window_to(&mut state, 30, 20, desk);
        let rect = state.windows[0].rect;
        assert_eq!((rect.x, rect.y), (28, 20));
    }
}

//! The connection to the X-Server

use super::{
    event::{
        ButtonEvent,
        ClientMessageEvent as XClientMessage,
        ClientRequest,
        ConfigFields,
        ConfigureEvent,
        ConfigureRequestData,
        KeyEvent,
        MotionEvent,
        PointerEvent,
        PropertyEvent,
        PropertyKind,
        StateAction,
        UnmapEvent,
        XEvent,
    },
    input::{lock_combinations, Button},
    property::{Hints, IcccmWindowState, Protocol, SizeHints},
    WindowInfo,
    XConn,
};
use crate::{
    core::{
        bar::DrawOp,
        bindings::KeyChord,
        decoration::{Color, Schemes},
        CursorKind,
        Keysym,
        Window,
    },
    error::Error,
    geometry::{Point, Rectangle},
    WM_NAME,
};
use anyhow::{anyhow, Context, Result};
use std::{
    cell::{Cell, RefCell},
    cmp,
    collections::VecDeque,
};
use x11rb::{
    atom_manager,
    connection::Connection,
    cursor::Handle as CursorHandle,
    errors::ReplyError,
    properties::{self, WmClass},
    protocol::{
        xinerama::ConnectionExt as _,
        xproto::{
            self,
            Allow,
            AtomEnum,
            ButtonIndex,
            ChangeGCAux,
            ChangeWindowAttributesAux,
            ClientMessageEvent,
            CloseDown,
            ConfigureNotifyEvent,
            ConfigureWindowAux,
            ConnectionExt,
            CreateGCAux,
            CreateWindowAux,
            EventMask,
            GrabMode,
            GrabStatus,
            InputFocus,
            Keycode,
            MapState,
            Mapping,
            ModMask,
            NotifyDetail,
            NotifyMode,
            PropMode,
            Property,
            StackMode,
            WindowClass as XWindowClass,
        },
        ErrorKind,
        Event,
    },
    resource_manager::Database,
    rust_connection::RustConnection,
    wrapper::ConnectionExt as _,
    CURRENT_TIME,
    NONE,
};

/// Focus target meaning "whatever window is under the pointer"
const POINTER_ROOT: Window = 1;

/// Keysym of the NumLock key
const XK_NUM_LOCK: Keysym = 0xff7f;

/// Longest string `ImageText8` accepts
const MAX_TEXT8_LEN: usize = 255;

// === Atoms === [[[

// Atoms interned at startup
atom_manager! {
    pub(crate) Atoms: AtomsCookie {
        ATOM,
        CARDINAL,
        WINDOW,
        STRING,
        UTF8_STRING,

        WM_NAME,
        WM_HINTS,
        WM_NORMAL_HINTS,
        WM_TRANSIENT_FOR,
        WM_PROTOCOLS,
        WM_DELETE_WINDOW,
        WM_STATE,
        WM_TAKE_FOCUS,

        _NET_SUPPORTED,
        _NET_WM_NAME,
        _NET_WM_STATE,
        _NET_SUPPORTING_WM_CHECK,
        _NET_WM_STATE_FULLSCREEN,
        _NET_ACTIVE_WINDOW,
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_DIALOG,
        _NET_CLIENT_LIST,
    }
}

// ]]] === Atoms ===

/// Hold all event masks
struct Masks {
    /// Mask for root window events
    root_event_mask:   EventMask,
    /// Mask for managed client events
    client_event_mask: EventMask,
    /// Mask for bar events
    bar_event_mask:    EventMask,
    /// Mask for button grabs
    button_mask:       EventMask,
    /// Mask for pointer grabs during a drag
    mouse_mask:        EventMask,
}

impl Masks {
    /// Create a new [`Masks`]
    fn new() -> Self {
        Self {
            root_event_mask:   EventMask::SUBSTRUCTURE_REDIRECT
                | EventMask::SUBSTRUCTURE_NOTIFY
                | EventMask::BUTTON_PRESS
                | EventMask::POINTER_MOTION
                | EventMask::ENTER_WINDOW
                | EventMask::LEAVE_WINDOW
                | EventMask::STRUCTURE_NOTIFY
                | EventMask::PROPERTY_CHANGE,
            client_event_mask: EventMask::ENTER_WINDOW
                | EventMask::FOCUS_CHANGE
                | EventMask::PROPERTY_CHANGE
                | EventMask::STRUCTURE_NOTIFY,
            bar_event_mask:    EventMask::BUTTON_PRESS | EventMask::EXPOSURE,
            button_mask:       EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
            mouse_mask:        EventMask::BUTTON_PRESS
                | EventMask::BUTTON_RELEASE
                | EventMask::POINTER_MOTION,
        }
    }
}

// ============================ FontMetrics =========================== [[[

/// Character widths of a core font
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FontMetrics {
    /// Pixels above the baseline
    pub(crate) ascent:  i32,
    /// Pixels below the baseline
    pub(crate) descent: i32,
    /// First character `widths` describes
    first:              u16,
    /// Width per character starting at `first`; empty for fixed width fonts
    widths:             Vec<i32>,
    /// Width of characters the font lacks, or of every character when
    /// `widths` is empty
    fallback:           i32,
}

impl FontMetrics {
    fn from_reply(reply: &xproto::QueryFontReply) -> Self {
        let widths = reply
            .char_infos
            .iter()
            .map(|info| i32::from(info.character_width))
            .collect::<Vec<_>>();
        let first = reply.min_char_or_byte2;

        let fallback = if widths.is_empty() {
            i32::from(reply.max_bounds.character_width)
        } else {
            reply
                .default_char
                .checked_sub(first)
                .and_then(|idx| widths.get(usize::from(idx)).copied())
                .unwrap_or(0)
        };

        Self {
            ascent: i32::from(reply.font_ascent),
            descent: i32::from(reply.font_descent),
            first,
            widths,
            fallback,
        }
    }

    /// Total height of a line
    pub(crate) const fn height(&self) -> i32 {
        self.ascent + self.descent
    }

    fn char_width(&self, byte: u8) -> i32 {
        if self.widths.is_empty() {
            return self.fallback;
        }
        u16::from(byte)
            .checked_sub(self.first)
            .and_then(|idx| self.widths.get(usize::from(idx)).copied())
            .unwrap_or(self.fallback)
    }

    /// Width of `text` once encoded with [`encode`]
    pub(crate) fn text_width(&self, text: &str) -> i32 {
        encode(text).into_iter().map(|b| self.char_width(b)).sum()
    }
}

/// Encode `text` as Latin-1, replacing what does not fit with `?`
pub(crate) fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

// ]]] === FontMetrics ===

// ============================= Keyboard ============================= [[[

/// Keyboard and modifier mappings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Keyboard {
    /// Lowest keycode in `keysyms`
    min_keycode: Keycode,
    /// Columns per keycode
    per_keycode: usize,
    /// The keyboard mapping, row by row
    keysyms:     Vec<Keysym>,
    /// Modifier bit of NumLock
    numlock:     u16,
}

impl Keyboard {
    /// Keysym in the first column for `keycode`
    fn keysym(&self, keycode: Keycode) -> Keysym {
        keycode
            .checked_sub(self.min_keycode)
            .and_then(|row| self.keysyms.get(usize::from(row) * self.per_keycode))
            .copied()
            .unwrap_or(0)
    }

    /// Every keycode producing `keysym` in its first column
    fn keycodes(&self, keysym: Keysym) -> Vec<Keycode> {
        if self.per_keycode == 0 {
            return vec![];
        }
        self.keysyms
            .chunks(self.per_keycode)
            .enumerate()
            .filter(|(_, row)| row.first() == Some(&keysym))
            .filter_map(|(idx, _)| u8::try_from(idx).ok())
            .filter_map(|idx| self.min_keycode.checked_add(idx))
            .collect()
    }
}

// ]]] === Keyboard ===

/// Cursors created at startup
#[derive(Debug, Clone, Copy)]
struct Cursors {
    normal:  xproto::Cursor,
    resize:  xproto::Cursor,
    move_:   xproto::Cursor,
}

impl Cursors {
    const fn get(&self, kind: CursorKind) -> xproto::Cursor {
        match kind {
            CursorKind::Normal => self.normal,
            CursorKind::Resize => self.resize,
            CursorKind::Move => self.move_,
        }
    }
}

/// Off-screen pixmap the bars are drawn on
#[derive(Debug, Clone, Copy)]
struct Canvas {
    pixmap: xproto::Pixmap,
    width:  u16,
    height: u16,
}

// ============================ XConnection =========================== [[[

/// The main connection to the X-Server
pub(crate) struct XConnection {
    /// Connection to the X-Server
    conn:         RustConnection,
    /// The screen being managed
    screen_num:   usize,
    /// The root window of `screen_num`
    root:         Window,
    /// Interned atoms
    atoms:        Atoms,
    /// Event masks
    masks:        Masks,
    /// The bar font
    font:         xproto::Font,
    /// Metrics of `font`
    metrics:      FontMetrics,
    /// Graphics context used for drawing the bars
    gctx:         xproto::Gcontext,
    /// Bar drawing surface
    canvas:       Cell<Canvas>,
    /// Cursors
    cursors:      Cursors,
    /// Window advertised in `_NET_SUPPORTING_WM_CHECK`
    check_window: Window,
    /// Keyboard mapping
    keyboard:     RefCell<Keyboard>,
    /// Events read while looking for something else
    pending:      RefCell<VecDeque<Event>>,
}

impl XConnection {
    /// Connect to the display and load `font_name`
    pub(crate) fn new(font_name: &str) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).map_err(Error::from)?;
        log::trace!("connected to screen {}", screen_num);

        let screen = conn.setup().roots[screen_num].clone();
        let root = screen.root;

        let atoms = Atoms::new(&conn)
            .context("failed to intern atoms")?
            .reply()
            .context("failed to get atoms reply")?;

        let font = conn.generate_id().context("failed to generate an `ID`")?;
        conn.open_font(font, font_name.as_bytes())
            .context("failed to request font")?
            .check()
            .map_err(|_| Error::Font(font_name.to_string()))?;
        let metrics = FontMetrics::from_reply(
            &conn
                .query_font(font)
                .context("failed to query font")?
                .reply()
                .context(format!("failed to get metrics of font {}", font_name))?,
        );

        let gctx = conn.generate_id().context("failed to generate an `ID`")?;
        conn.create_gc(gctx, root, &CreateGCAux::new().font(font))?
            .check()
            .context("failed to create graphics context")?;

        let pixmap = conn.generate_id().context("failed to generate an `ID`")?;
        let canvas = Canvas {
            pixmap,
            width: screen.width_in_pixels,
            height: cmp::max(1, metrics.height() + 10) as u16,
        };
        conn.create_pixmap(screen.root_depth, pixmap, root, canvas.width, canvas.height)
            .context("failed to create bar pixmap")?;

        let cursors = Self::load_cursors(&conn, screen_num)?;
        let check_window = conn.generate_id().context("failed to generate an `ID`")?;

        let xconn = Self {
            conn,
            screen_num,
            root,
            atoms,
            masks: Masks::new(),
            font,
            metrics,
            gctx,
            canvas: Cell::new(canvas),
            cursors,
            check_window,
            keyboard: RefCell::new(Keyboard::default()),
            pending: RefCell::new(VecDeque::new()),
        };
        xconn.refresh_keyboard()?;

        Ok(xconn)
    }

    /// Load the cursors from the cursor theme
    fn load_cursors(conn: &RustConnection, screen_num: usize) -> Result<Cursors> {
        log::debug!("loading cursors");
        let db = Database::new_from_default(conn).context("failed to get resource database")?;
        let handle = CursorHandle::new(conn, screen_num, &db)
            .context("failed to create cursor handle")?
            .reply()
            .context("failed to get cursor handle")?;

        Ok(Cursors {
            normal: handle.load_cursor(conn, "left_ptr")?,
            resize: handle.load_cursor(conn, "sizing")?,
            move_:  handle.load_cursor(conn, "fleur")?,
        })
    }

    /// Return the connection to the X-Server
    pub(crate) const fn aux(&self) -> &RustConnection {
        &self.conn
    }

    /// Metrics of the bar font
    pub(crate) const fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    // ========================= Helpers ========================= [[[

    /// Read a text property, accepting `STRING` and `UTF8_STRING`
    fn text_property(&self, window: Window, atom: xproto::Atom) -> Option<String> {
        let reply = self
            .aux()
            .get_property(false, window, atom, AtomEnum::ANY, 0, u32::MAX)
            .ok()?
            .reply()
            .ok()?;

        let bytes = reply.value.split(|b| *b == 0).next().unwrap_or(&[]);
        if bytes.is_empty() {
            return None;
        }

        if reply.type_ == self.atoms.UTF8_STRING {
            Some(String::from_utf8_lossy(bytes).into_owned())
        } else if reply.type_ == self.atoms.STRING {
            Some(bytes.iter().map(|b| char::from(*b)).collect())
        } else {
            None
        }
    }

    /// Read the atoms stored in an `ATOM` property
    fn atom_property(&self, window: Window, atom: xproto::Atom) -> Vec<xproto::Atom> {
        self.aux()
            .get_property(false, window, atom, AtomEnum::ATOM, 0, u32::MAX)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .and_then(|reply| reply.value32().map(Iterator::collect))
            .unwrap_or_default()
    }

    /// Atom of a [`Protocol`]
    const fn protocol_atom(&self, protocol: Protocol) -> xproto::Atom {
        match protocol {
            Protocol::Delete => self.atoms.WM_DELETE_WINDOW,
            Protocol::TakeFocus => self.atoms.WM_TAKE_FOCUS,
        }
    }

    /// Make sure the canvas covers `width` x `height`
    fn ensure_canvas(&self, width: u16, height: u16) -> Result<Canvas> {
        let canvas = self.canvas.get();
        if canvas.width >= width && canvas.height >= height {
            return Ok(canvas);
        }

        log::debug!("growing bar canvas to {}x{}", width, height);
        let screen = &self.aux().setup().roots[self.screen_num];
        self.aux().free_pixmap(canvas.pixmap)?;
        let canvas = Canvas {
            pixmap: canvas.pixmap,
            width:  cmp::max(width, canvas.width),
            height: cmp::max(height, canvas.height),
        };
        self.aux().create_pixmap(
            screen.root_depth,
            canvas.pixmap,
            self.root,
            canvas.width,
            canvas.height,
        )?;
        self.canvas.set(canvas);
        Ok(canvas)
    }

    fn fill(&self, drawable: xproto::Drawable, rect: Rectangle, color: Color, filled: bool) -> Result<()> {
        self.aux()
            .change_gc(self.gctx, &ChangeGCAux::new().foreground(color))?;
        let rect = xproto::Rectangle {
            x:      rect.x as i16,
            y:      rect.y as i16,
            width:  cmp::max(rect.width, 0) as u16,
            height: cmp::max(rect.height, 0) as u16,
        };
        if filled {
            self.aux().poly_fill_rectangle(drawable, self.gctx, &[rect])?;
        } else {
            let outline = xproto::Rectangle {
                width: rect.width.saturating_sub(1),
                height: rect.height.saturating_sub(1),
                ..rect
            };
            self.aux().poly_rectangle(drawable, self.gctx, &[outline])?;
        }
        Ok(())
    }

    // ]]] === Helpers ===

    // ======================== Translation ====================== [[[

    /// Turn a protocol event into an [`XEvent`]. Errors that only mean a
    /// window vanished are dropped
    fn translate(&self, event: Event) -> Result<Option<XEvent>> {
        let event = match event {
            Event::Error(err) => {
                if Error::is_benign(err.error_kind, err.major_opcode) {
                    log::debug!(
                        "ignoring {:?} error from request {}",
                        err.error_kind,
                        err.major_opcode
                    );
                    return Ok(None);
                }
                return Err(Error::Protocol {
                    kind:         err.error_kind,
                    major_opcode: err.major_opcode,
                }
                .into());
            },
            Event::MapRequest(e) => XEvent::MapRequest(e.window),
            Event::UnmapNotify(e) => XEvent::UnmapNotify(UnmapEvent {
                window:    e.window,
                synthetic: e.response_type & 0x80 != 0,
            }),
            Event::DestroyNotify(e) => XEvent::DestroyNotify(e.window),
            Event::ConfigureRequest(e) => XEvent::ConfigureRequest(ConfigureRequestData {
                window:       e.window,
                fields:       ConfigFields::from_bits_truncate(u16::from(e.value_mask)),
                rect:         Rectangle::new(
                    i32::from(e.x),
                    i32::from(e.y),
                    i32::from(e.width),
                    i32::from(e.height),
                ),
                border_width: i32::from(e.border_width),
                sibling:      e.sibling,
                stack_mode:   e.stack_mode,
            }),
            Event::ConfigureNotify(e) => XEvent::ConfigureNotify(ConfigureEvent {
                window: e.window,
                rect:   Rectangle::new(
                    i32::from(e.x),
                    i32::from(e.y),
                    i32::from(e.width),
                    i32::from(e.height),
                ),
            }),
            Event::PropertyNotify(e) => {
                let kind = if e.atom == self.atoms.WM_NAME || e.atom == self.atoms._NET_WM_NAME {
                    PropertyKind::Name
                } else if e.atom == self.atoms.WM_NORMAL_HINTS {
                    PropertyKind::NormalHints
                } else if e.atom == self.atoms.WM_HINTS {
                    PropertyKind::Hints
                } else if e.atom == self.atoms.WM_TRANSIENT_FOR {
                    PropertyKind::TransientFor
                } else if e.atom == self.atoms._NET_WM_WINDOW_TYPE {
                    PropertyKind::WindowType
                } else {
                    PropertyKind::Other
                };
                XEvent::PropertyNotify(PropertyEvent {
                    window: e.window,
                    kind,
                    deleted: e.state == Property::DELETE,
                })
            },
            Event::ClientMessage(e) => {
                let data = e.data.as_data32();
                let fullscreen = self.atoms._NET_WM_STATE_FULLSCREEN;
                let request = if e.type_ == self.atoms._NET_WM_STATE
                    && (data[1] == fullscreen || data[2] == fullscreen)
                {
                    StateAction::from_value(data[0]).map_or(ClientRequest::Other, ClientRequest::Fullscreen)
                } else if e.type_ == self.atoms._NET_ACTIVE_WINDOW {
                    ClientRequest::Activate
                } else {
                    ClientRequest::Other
                };
                XEvent::ClientMessage(XClientMessage {
                    window: e.window,
                    request,
                })
            },
            Event::EnterNotify(e) => XEvent::EnterNotify(PointerEvent {
                window:   e.event,
                root:     Point::new(i32::from(e.root_x), i32::from(e.root_y)),
                relevant: (e.mode == NotifyMode::NORMAL && e.detail != NotifyDetail::INFERIOR)
                    || e.event == self.root,
            }),
            Event::FocusIn(e) => XEvent::FocusIn(e.event),
            Event::ButtonPress(e) => XEvent::ButtonPress(ButtonEvent {
                window: e.event,
                button: e.detail,
                state:  u16::from(e.state),
                root:   Point::new(i32::from(e.root_x), i32::from(e.root_y)),
                event:  Point::new(i32::from(e.event_x), i32::from(e.event_y)),
            }),
            Event::ButtonRelease(e) => XEvent::ButtonRelease(ButtonEvent {
                window: e.event,
                button: e.detail,
                state:  u16::from(e.state),
                root:   Point::new(i32::from(e.root_x), i32::from(e.root_y)),
                event:  Point::new(i32::from(e.event_x), i32::from(e.event_y)),
            }),
            Event::MotionNotify(e) => XEvent::MotionNotify(MotionEvent {
                window: e.event,
                root:   Point::new(i32::from(e.root_x), i32::from(e.root_y)),
                time:   e.time,
            }),
            Event::KeyPress(e) => XEvent::KeyPress(KeyEvent {
                keycode: e.detail,
                state:   u16::from(e.state),
            }),
            Event::MappingNotify(e) => XEvent::MappingNotify {
                keyboard: e.request == Mapping::KEYBOARD,
            },
            Event::Expose(e) => XEvent::Expose {
                window: e.window,
                count:  e.count,
            },
            other => XEvent::Unknown(other.response_type()),
        };

        Ok(Some(event))
    }

    // ]]] === Translation ===
}

impl XConn for XConnection {
    // ========================= Setup ========================= [[[

    fn root(&self) -> Window {
        self.root
    }

    fn screen_rect(&self) -> Rectangle {
        let screen = &self.aux().setup().roots[self.screen_num];
        Rectangle::new(
            0,
            0,
            i32::from(screen.width_in_pixels),
            i32::from(screen.height_in_pixels),
        )
    }

    fn screens(&self) -> Vec<Rectangle> {
        let active = self
            .aux()
            .xinerama_is_active()
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map_or(false, |reply| reply.state != 0);
        if !active {
            return vec![];
        }

        self.aux()
            .xinerama_query_screens()
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map_or_else(Vec::new, |reply| {
                reply
                    .screen_info
                    .iter()
                    .map(|info| {
                        Rectangle::new(
                            i32::from(info.x_org),
                            i32::from(info.y_org),
                            i32::from(info.width),
                            i32::from(info.height),
                        )
                    })
                    .collect()
            })
    }

    fn become_wm(&self) -> Result<()> {
        log::debug!("attempting to become the window manager");

        if let Err(ReplyError::X11Error(err)) = self
            .aux()
            .change_window_attributes(
                self.root,
                &ChangeWindowAttributesAux::new().event_mask(EventMask::SUBSTRUCTURE_REDIRECT),
            )
            .context("failed to select substructure redirect")?
            .check()
        {
            if err.error_kind == ErrorKind::Access {
                return Err(Error::OtherWindowManager.into());
            }

            return Err(anyhow!("failed to set up the window manager: {:?}", err.error_kind));
        }

        Ok(())
    }

    fn init_wm(&self) -> Result<()> {
        log::debug!("creating `_NET_SUPPORTING_WM_CHECK` window");
        self.aux().create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            self.check_window,
            self.root,
            0,
            0,
            1,
            1,
            0,
            XWindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new(),
        )?;

        for window in [self.check_window, self.root] {
            self.aux().change_property32(
                PropMode::REPLACE,
                window,
                self.atoms._NET_SUPPORTING_WM_CHECK,
                AtomEnum::WINDOW,
                &[self.check_window],
            )?;
        }
        self.aux().change_property8(
            PropMode::REPLACE,
            self.check_window,
            self.atoms._NET_WM_NAME,
            self.atoms.UTF8_STRING,
            WM_NAME!().as_bytes(),
        )?;

        let supported = [
            self.atoms._NET_SUPPORTED,
            self.atoms._NET_WM_NAME,
            self.atoms._NET_WM_STATE,
            self.atoms._NET_SUPPORTING_WM_CHECK,
            self.atoms._NET_WM_STATE_FULLSCREEN,
            self.atoms._NET_ACTIVE_WINDOW,
            self.atoms._NET_WM_WINDOW_TYPE,
            self.atoms._NET_WM_WINDOW_TYPE_DIALOG,
            self.atoms._NET_CLIENT_LIST,
        ];
        self.aux().change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms._NET_SUPPORTED,
            AtomEnum::ATOM,
            &supported,
        )?;
        self.aux()
            .delete_property(self.root, self.atoms._NET_CLIENT_LIST)?;

        log::debug!("selecting root window events");
        self.aux()
            .change_window_attributes(
                self.root,
                &ChangeWindowAttributesAux::new()
                    .event_mask(self.masks.root_event_mask)
                    .cursor(self.cursors.normal),
            )
            .context("failed to select root window events")?
            .check()
            .context("failed to check selecting root window events")?;

        Ok(())
    }

    fn cleanup(&self) -> Result<()> {
        log::debug!("releasing server resources");
        self.aux()
            .ungrab_key(xproto::Grab::ANY, self.root, ModMask::ANY)?;
        for cursor in [self.cursors.normal, self.cursors.resize, self.cursors.move_] {
            self.aux().free_cursor(cursor)?;
        }
        self.aux().destroy_window(self.check_window)?;
        self.aux().free_pixmap(self.canvas.get().pixmap)?;
        self.aux().free_gc(self.gctx)?;
        self.aux().close_font(self.font)?;
        self.aux()
            .set_input_focus(InputFocus::POINTER_ROOT, POINTER_ROOT, CURRENT_TIME)?;
        self.aux()
            .delete_property(self.root, self.atoms._NET_ACTIVE_WINDOW)?;
        self.aux().sync().context("failed to sync on cleanup")?;

        Ok(())
    }

    fn font_height(&self) -> i32 {
        self.metrics.height()
    }

    fn text_width(&self, text: &str) -> i32 {
        self.metrics.text_width(text)
    }

    // ]]] === Setup ===

    // ======================== Events ========================= [[[

    fn next_event(&self) -> Result<XEvent> {
        loop {
            let queued = self.pending.borrow_mut().pop_front();
            let event = match queued {
                Some(event) => event,
                None => self
                    .aux()
                    .wait_for_event()
                    .context("failed to wait for event")?,
            };

            if let Some(event) = self.translate(event)? {
                return Ok(event);
            }
        }
    }

    fn flush(&self) {
        if let Err(e) = self.aux().flush() {
            log::warn!("failed to flush connection: {}", e);
        }
    }

    fn drop_enter_events(&self) -> Result<()> {
        self.aux().sync().context("failed to sync")?;
        while let Some(event) = self.aux().poll_for_event()? {
            if !matches!(event, Event::EnterNotify(_)) {
                self.pending.borrow_mut().push_back(event);
            }
        }
        Ok(())
    }

    // ]]] === Events ===

    // ======================== Queries ======================== [[[

    fn top_level_windows(&self) -> Result<Vec<Window>> {
        Ok(self
            .aux()
            .query_tree(self.root)
            .context("failed to query tree")?
            .reply()
            .context("failed to get tree")?
            .children)
    }

    fn window_info(&self, window: Window) -> Option<WindowInfo> {
        let attrs = self.aux().get_window_attributes(window).ok()?;
        let geom = self.aux().get_geometry(window).ok()?;
        let attrs = attrs.reply().ok()?;
        let geom = geom.reply().ok()?;

        Some(WindowInfo {
            rect:              Rectangle::new(
                i32::from(geom.x),
                i32::from(geom.y),
                i32::from(geom.width),
                i32::from(geom.height),
            ),
            border_width:      i32::from(geom.border_width),
            override_redirect: attrs.override_redirect,
            viewable:          attrs.map_state == MapState::VIEWABLE,
        })
    }

    fn window_state(&self, window: Window) -> Option<IcccmWindowState> {
        let reply = self
            .aux()
            .get_property(false, window, self.atoms.WM_STATE, self.atoms.WM_STATE, 0, 2)
            .ok()?
            .reply()
            .ok()?;
        let state = reply
            .value32()?
            .next()
            .and_then(IcccmWindowState::from_value);
        state
    }

    fn window_title(&self, window: Window) -> Option<String> {
        self.text_property(window, self.atoms._NET_WM_NAME)
            .or_else(|| self.text_property(window, self.atoms.WM_NAME))
    }

    fn root_name(&self) -> Option<String> {
        self.text_property(self.root, self.atoms.WM_NAME)
    }

    fn window_class(&self, window: Window) -> Option<(String, String)> {
        let class = WmClass::get(self.aux(), window).ok()?.reply().ok()?;
        Some((
            String::from_utf8_lossy(class.instance()).into_owned(),
            String::from_utf8_lossy(class.class()).into_owned(),
        ))
    }

    fn size_hints(&self, window: Window) -> Option<SizeHints> {
        properties::WmSizeHints::get_normal_hints(self.aux(), window)
            .ok()?
            .reply()
            .ok()
            .map(|hints| SizeHints::from(&hints))
    }

    fn hints(&self, window: Window) -> Option<Hints> {
        properties::WmHints::get(self.aux(), window)
            .ok()?
            .reply()
            .ok()
            .map(|hints| Hints::from(&hints))
    }

    fn transient_for(&self, window: Window) -> Option<Window> {
        self.aux()
            .get_property(
                false,
                window,
                self.atoms.WM_TRANSIENT_FOR,
                AtomEnum::WINDOW,
                0,
                1,
            )
            .ok()?
            .reply()
            .ok()?
            .value32()?
            .next()
            .filter(|w| *w != NONE)
    }

    fn requests_fullscreen(&self, window: Window) -> bool {
        self.atom_property(window, self.atoms._NET_WM_STATE)
            .contains(&self.atoms._NET_WM_STATE_FULLSCREEN)
    }

    fn is_dialog(&self, window: Window) -> bool {
        self.atom_property(window, self.atoms._NET_WM_WINDOW_TYPE)
            .contains(&self.atoms._NET_WM_WINDOW_TYPE_DIALOG)
    }

    fn supports_protocol(&self, window: Window, protocol: Protocol) -> bool {
        let atom = self.protocol_atom(protocol);
        self.atom_property(window, self.atoms.WM_PROTOCOLS)
            .contains(&atom)
    }

    fn query_pointer(&self) -> Option<Point> {
        let reply = self.aux().query_pointer(self.root).ok()?.reply().ok()?;
        Some(Point::new(i32::from(reply.root_x), i32::from(reply.root_y)))
    }

    fn keysym(&self, keycode: Keycode) -> Keysym {
        self.keyboard.borrow().keysym(keycode)
    }

    fn numlock_mask(&self) -> u16 {
        self.keyboard.borrow().numlock
    }

    fn refresh_keyboard(&self) -> Result<()> {
        let setup = self.aux().setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);

        let mapping = self
            .aux()
            .get_keyboard_mapping(min, max - min + 1)
            .context("failed to request keyboard mapping")?
            .reply()
            .context("failed to get keyboard mapping")?;

        let mut keyboard = Keyboard {
            min_keycode: min,
            per_keycode: usize::from(mapping.keysyms_per_keycode),
            keysyms:     mapping.keysyms,
            numlock:     0,
        };

        let modifiers = self
            .aux()
            .get_modifier_mapping()
            .context("failed to request modifier mapping")?
            .reply()
            .context("failed to get modifier mapping")?;
        let per_modifier = modifiers.keycodes.len() / 8;
        let numlock_codes = keyboard.keycodes(XK_NUM_LOCK);

        if per_modifier > 0 {
            if let Some(idx) = modifiers
                .keycodes
                .iter()
                .position(|code| *code != 0 && numlock_codes.contains(code))
            {
                keyboard.numlock = 1 << (idx / per_modifier);
            }
        }

        log::debug!("NumLock is modifier {:#x}", keyboard.numlock);
        *self.keyboard.borrow_mut() = keyboard;
        Ok(())
    }

    // ]]] === Queries ===

    // ======================= Requests ======================== [[[

    fn configure_window(&self, window: Window, rect: Rectangle, border_width: i32) -> Result<()> {
        log::trace!("configuring Window({:#0x}) to {}", window, rect);
        self.aux()
            .configure_window(window, &rect.to_aux(border_width))
            .context(format!("failed to configure Window({:#0x})", window))?;
        Ok(())
    }

    fn configure_unmanaged(&self, request: &ConfigureRequestData) -> Result<()> {
        let fields = request.fields;
        let mut aux = ConfigureWindowAux::new();
        if fields.contains(ConfigFields::X) {
            aux = aux.x(request.rect.x);
        }
        if fields.contains(ConfigFields::Y) {
            aux = aux.y(request.rect.y);
        }
        if fields.contains(ConfigFields::WIDTH) {
            aux = aux.width(cmp::max(request.rect.width, 1) as u32);
        }
        if fields.contains(ConfigFields::HEIGHT) {
            aux = aux.height(cmp::max(request.rect.height, 1) as u32);
        }
        if fields.contains(ConfigFields::BORDER_WIDTH) {
            aux = aux.border_width(cmp::max(request.border_width, 0) as u32);
        }
        if fields.contains(ConfigFields::SIBLING) {
            aux = aux.sibling(request.sibling);
        }
        if fields.contains(ConfigFields::STACK_MODE) {
            aux = aux.stack_mode(request.stack_mode);
        }

        self.aux()
            .configure_window(request.window, &aux)
            .context(format!(
                "failed to configure unmanaged Window({:#0x})",
                request.window
            ))?;
        Ok(())
    }

    fn send_configure_notify(
        &self,
        window: Window,
        rect: Rectangle,
        border_width: i32,
    ) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: xproto::CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: NONE,
            x: rect.x as i16,
            y: rect.y as i16,
            width: cmp::max(rect.width, 1) as u16,
            height: cmp::max(rect.height, 1) as u16,
            border_width: cmp::max(border_width, 0) as u16,
            override_redirect: false,
        };

        self.aux()
            .send_event(false, window, EventMask::STRUCTURE_NOTIFY, &event)
            .context(format!(
                "failed to send ConfigureNotify to Window({:#0x})",
                window
            ))?;
        Ok(())
    }

    fn move_window(&self, window: Window, point: Point) -> Result<()> {
        self.aux()
            .configure_window(window, &ConfigureWindowAux::new().x(point.x).y(point.y))
            .context(format!("failed to move Window({:#0x})", window))?;
        Ok(())
    }

    fn set_border_width(&self, window: Window, width: i32) -> Result<()> {
        log::trace!("setting Window({:#0x}) border width {}", window, width);
        self.aux()
            .configure_window(
                window,
                &ConfigureWindowAux::new().border_width(cmp::max(width, 0) as u32),
            )
            .context(format!(
                "failed to set Window({:#0x}) border width to {}",
                window, width
            ))?;
        Ok(())
    }

    fn set_border_color(&self, window: Window, color: Color) -> Result<()> {
        log::trace!("setting Window({:#0x}) border color {:#08x}", window, color);
        self.aux()
            .change_window_attributes(
                window,
                &ChangeWindowAttributesAux::new().border_pixel(color),
            )
            .context(format!(
                "failed to set Window({:#0x}) border color to {:#08x}",
                window, color
            ))?;
        Ok(())
    }

    fn raise_window(&self, window: Window) -> Result<()> {
        self.aux()
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
            .context(format!("failed to raise Window({:#0x})", window))?;
        Ok(())
    }

    fn stack_below(&self, window: Window, sibling: Window) -> Result<()> {
        self.aux()
            .configure_window(
                window,
                &ConfigureWindowAux::new()
                    .sibling(sibling)
                    .stack_mode(StackMode::BELOW),
            )
            .context(format!(
                "failed to stack Window({:#0x}) below Window({:#0x})",
                window, sibling
            ))?;
        Ok(())
    }

    fn map_window(&self, window: Window) -> Result<()> {
        self.aux()
            .map_window(window)
            .context(format!("failed to map Window({:#0x})", window))?;
        Ok(())
    }

    fn select_client_events(&self, window: Window) -> Result<()> {
        self.aux()
            .change_window_attributes(
                window,
                &ChangeWindowAttributesAux::new().event_mask(self.masks.client_event_mask),
            )
            .context(format!(
                "failed to select events on Window({:#0x})",
                window
            ))?;
        Ok(())
    }

    fn set_window_state(&self, window: Window, state: IcccmWindowState) -> Result<()> {
        self.aux()
            .change_property32(
                PropMode::REPLACE,
                window,
                self.atoms.WM_STATE,
                self.atoms.WM_STATE,
                &[state.value(), NONE],
            )
            .context(format!("failed to set `WM_STATE` of Window({:#0x})", window))?;
        Ok(())
    }

    fn set_fullscreen_state(&self, window: Window, fullscreen: bool) -> Result<()> {
        let data: &[u32] = if fullscreen {
            &[self.atoms._NET_WM_STATE_FULLSCREEN]
        } else {
            &[]
        };
        self.aux()
            .change_property32(
                PropMode::REPLACE,
                window,
                self.atoms._NET_WM_STATE,
                AtomEnum::ATOM,
                data,
            )
            .context(format!(
                "failed to set `_NET_WM_STATE` of Window({:#0x})",
                window
            ))?;
        Ok(())
    }

    fn clear_urgency(&self, window: Window) -> Result<()> {
        let mut hints = match properties::WmHints::get(self.aux(), window)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
        {
            Some(hints) => hints,
            None => return Ok(()),
        };

        hints.urgent = false;
        hints
            .set(self.aux(), window)
            .context(format!("failed to set `WM_HINTS` of Window({:#0x})", window))?;
        Ok(())
    }

    fn focus_window(&self, window: Window) -> Result<()> {
        log::debug!("focusing Window({:#0x})", window);
        self.aux()
            .set_input_focus(InputFocus::POINTER_ROOT, window, CURRENT_TIME)
            .context(format!(
                "failed to `set_input_focus` for Window({:#0x})",
                window
            ))?;

        self.aux()
            .change_property32(
                PropMode::REPLACE,
                self.root,
                self.atoms._NET_ACTIVE_WINDOW,
                AtomEnum::WINDOW,
                &[window],
            )
            .context("failed to replace property `_NET_ACTIVE_WINDOW`")?;

        Ok(())
    }

    fn focus_root(&self) -> Result<()> {
        log::debug!("focusing the root window");
        self.aux()
            .set_input_focus(InputFocus::POINTER_ROOT, self.root, CURRENT_TIME)
            .context("failed to focus the root window")?;
        self.aux()
            .delete_property(self.root, self.atoms._NET_ACTIVE_WINDOW)
            .context("failed to delete `_NET_ACTIVE_WINDOW`")?;
        Ok(())
    }

    fn send_protocol(&self, window: Window, protocol: Protocol) -> Result<bool> {
        if !self.supports_protocol(window, protocol) {
            return Ok(false);
        }

        let atom = self.protocol_atom(protocol);
        let data = [atom, CURRENT_TIME, 0, 0, 0];
        let event = ClientMessageEvent::new(32, window, self.atoms.WM_PROTOCOLS, data);
        log::debug!("sending {:?} to Window({:#0x})", protocol, window);

        self.aux()
            .send_event(false, window, EventMask::NO_EVENT, &event)
            .context(format!(
                "failed to send {:?} to Window({:#0x})",
                protocol, window
            ))?;
        Ok(true)
    }

    fn kill_client(&self, window: Window) -> Result<()> {
        log::debug!("killing the client of Window({:#0x})", window);
        self.grab_server()?;
        self.aux().set_close_down_mode(CloseDown::DESTROY_ALL)?;
        self.aux()
            .kill_client(window)
            .context(format!("failed to kill Window({:#0x})", window))?;
        self.aux().sync()?;
        self.ungrab_server()
    }

    fn append_client_list(&self, window: Window) -> Result<()> {
        self.aux()
            .change_property32(
                PropMode::APPEND,
                self.root,
                self.atoms._NET_CLIENT_LIST,
                AtomEnum::WINDOW,
                &[window],
            )
            .context("failed to append to `_NET_CLIENT_LIST`")?;
        Ok(())
    }

    fn set_client_list(&self, windows: &[Window]) -> Result<()> {
        self.aux()
            .change_property32(
                PropMode::REPLACE,
                self.root,
                self.atoms._NET_CLIENT_LIST,
                AtomEnum::WINDOW,
                windows,
            )
            .context("failed to replace `_NET_CLIENT_LIST`")?;
        Ok(())
    }

    fn grab_server(&self) -> Result<()> {
        self.aux().grab_server().context("failed to grab server")?;
        Ok(())
    }

    fn ungrab_server(&self) -> Result<()> {
        self.aux()
            .ungrab_server()
            .context("failed to ungrab server")?;
        Ok(())
    }

    // ]]] === Requests ===

    // ======================== Input ========================== [[[

    fn grab_keys(&self, chords: &[KeyChord]) -> Result<()> {
        self.aux()
            .ungrab_key(xproto::Grab::ANY, self.root, ModMask::ANY)
            .context("failed to ungrab keys")?;

        let keyboard = self.keyboard.borrow();
        for chord in chords {
            for code in keyboard.keycodes(chord.keysym) {
                for lock in lock_combinations(keyboard.numlock) {
                    self.aux()
                        .grab_key(
                            true,
                            self.root,
                            chord.mask | lock,
                            code,
                            GrabMode::ASYNC,
                            GrabMode::ASYNC,
                        )
                        .context(format!("failed to grab key {}", chord))?;
                }
            }
        }

        Ok(())
    }

    fn grab_buttons(&self, window: Window, focused: bool, buttons: &[(u16, Button)]) -> Result<()> {
        self.ungrab_buttons(window)?;

        if !focused {
            self.aux()
                .grab_button(
                    false,
                    window,
                    u32::from(self.masks.button_mask) as u16,
                    GrabMode::SYNC,
                    GrabMode::SYNC,
                    NONE,
                    NONE,
                    ButtonIndex::ANY,
                    ModMask::ANY,
                )
                .context("failed to grab all buttons")?;
        }

        let numlock = self.numlock_mask();
        for (mask, button) in buttons {
            let index = match button {
                Button::Left => ButtonIndex::M1,
                Button::Middle => ButtonIndex::M2,
                Button::Right => ButtonIndex::M3,
                Button::ScrollUp => ButtonIndex::M4,
                Button::ScrollDown => ButtonIndex::M5,
            };
            for lock in lock_combinations(numlock) {
                self.aux()
                    .grab_button(
                        false,
                        window,
                        u32::from(self.masks.button_mask) as u16,
                        GrabMode::ASYNC,
                        GrabMode::SYNC,
                        NONE,
                        NONE,
                        index,
                        *mask | lock,
                    )
                    .context(format!(
                        "failed to grab button on Window({:#0x})",
                        window
                    ))?;
            }
        }

        Ok(())
    }

    fn ungrab_buttons(&self, window: Window) -> Result<()> {
        self.aux()
            .ungrab_button(ButtonIndex::ANY, window, ModMask::ANY)
            .context("failed to ungrab all buttons")?;
        Ok(())
    }

    fn grab_pointer(&self, cursor: CursorKind) -> Result<bool> {
        log::debug!("attempting to grab control of the pointer");
        let reply = self
            .aux()
            .grab_pointer(
                false,
                self.root,
                u32::from(self.masks.mouse_mask) as u16,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                self.cursors.get(cursor),
                CURRENT_TIME,
            )
            .context("failed to grab pointer")?
            .reply()
            .context("failed to get pointer grab reply")?;

        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.aux()
            .ungrab_pointer(CURRENT_TIME)
            .context("failed to ungrab pointer")?;
        Ok(())
    }

    fn warp_pointer(&self, window: Window, point: Point) -> Result<()> {
        self.aux()
            .warp_pointer(
                NONE,
                window,
                0,
                0,
                0,
                0,
                point.x as i16,
                point.y as i16,
            )
            .context(format!(
                "failed to warp pointer to Window({:#0x})",
                window
            ))?;
        Ok(())
    }

    fn replay_pointer(&self) -> Result<()> {
        self.aux()
            .allow_events(Allow::REPLAY_POINTER, CURRENT_TIME)
            .context("failed to replay pointer")?;
        Ok(())
    }

    // ]]] === Input ===

    // ========================= Bars ========================== [[[

    fn create_bar(&self, rect: Rectangle) -> Result<Window> {
        let bar = self.aux().generate_id().context("failed to generate an `ID`")?;
        log::debug!("creating bar Window({:#0x}) at {}", bar, rect);

        self.aux()
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                bar,
                self.root,
                rect.x as i16,
                rect.y as i16,
                cmp::max(rect.width, 1) as u16,
                cmp::max(rect.height, 1) as u16,
                0,
                XWindowClass::INPUT_OUTPUT,
                x11rb::COPY_FROM_PARENT,
                &CreateWindowAux::new()
                    .override_redirect(1)
                    .background_pixmap(u32::from(xproto::BackPixmap::PARENT_RELATIVE))
                    .event_mask(self.masks.bar_event_mask)
                    .cursor(self.cursors.normal),
            )
            .context("failed to create bar")?;

        let class = format!("{0}\0{0}\0", WM_NAME!());
        self.aux().change_property8(
            PropMode::REPLACE,
            bar,
            AtomEnum::WM_CLASS,
            AtomEnum::STRING,
            class.as_bytes(),
        )?;
        self.aux().map_window(bar)?;
        self.raise_window(bar)?;

        Ok(bar)
    }

    fn destroy_window(&self, window: Window) -> Result<()> {
        self.aux()
            .unmap_window(window)
            .context(format!("failed to unmap Window({:#0x})", window))?;
        self.aux()
            .destroy_window(window)
            .context(format!("failed to destroy Window({:#0x})", window))?;
        Ok(())
    }

    fn draw_bar(
        &self,
        bar: Window,
        width: i32,
        height: i32,
        ops: &[DrawOp],
        schemes: &Schemes,
    ) -> Result<()> {
        let (width, height) = (cmp::max(width, 1) as u16, cmp::max(height, 1) as u16);
        let canvas = self.ensure_canvas(width, height)?;
        let pixmap = canvas.pixmap;

        for op in ops {
            match op {
                DrawOp::Rect {
                    rect,
                    scheme,
                    filled,
                    invert,
                } => {
                    let scheme = schemes.get(*scheme);
                    let color = if *invert { scheme.bg } else { scheme.fg };
                    self.fill(pixmap, *rect, color, *filled)?;
                },
                DrawOp::Text {
                    rect,
                    scheme,
                    pad,
                    text,
                    invert,
                } => {
                    let scheme = schemes.get(*scheme);
                    let (fg, bg) = if *invert {
                        (scheme.bg, scheme.fg)
                    } else {
                        (scheme.fg, scheme.bg)
                    };
                    self.fill(pixmap, *rect, bg, true)?;

                    if text.is_empty() {
                        continue;
                    }
                    let mut bytes = encode(text);
                    bytes.truncate(MAX_TEXT8_LEN);
                    let y = rect.y + (rect.height - self.metrics.height()) / 2 + self.metrics.ascent;

                    self.aux().change_gc(
                        self.gctx,
                        &ChangeGCAux::new().foreground(fg).background(bg),
                    )?;
                    self.aux().image_text8(
                        pixmap,
                        self.gctx,
                        (rect.x + pad) as i16,
                        y as i16,
                        &bytes,
                    )?;
                },
            }
        }

        self.aux()
            .copy_area(pixmap, bar, self.gctx, 0, 0, 0, 0, width, height)
            .context(format!("failed to copy bar to Window({:#0x})", bar))?;
        self.flush();

        Ok(())
    }

    // ]]] === Bars ===
}

// ]]] === XConnection ===

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(widths: Vec<i32>) -> FontMetrics {
        FontMetrics {
            ascent: 8,
            descent: 2,
            first: u16::from(b'a'),
            widths,
            fallback: 3,
        }
    }

    #[test]
    fn fixed_width_font() {
        let m = metrics(vec![]);
        assert_eq!(m.height(), 10);
        assert_eq!(m.text_width("hello"), 15);
    }

    #[test]
    fn proportional_font_uses_per_char_widths() {
        let m = metrics(vec![5, 6, 7]);
        assert_eq!(m.text_width("abc"), 18);
        assert_eq!(m.text_width("a z"), 5 + 3 + 3);
    }

    #[test]
    fn latin1_encoding() {
        assert_eq!(encode("aé"), vec![b'a', 0xe9]);
        assert_eq!(encode("→"), vec![b'?']);
    }

    #[test]
    fn keycode_lookup() {
        let keyboard = Keyboard {
            min_keycode: 8,
            per_keycode: 2,
            keysyms:     vec![0x61, 0x41, 0x62, 0x42, 0x61, 0x41],
            numlock:     0,
        };
        assert_eq!(keyboard.keysym(8), 0x61);
        assert_eq!(keyboard.keysym(9), 0x62);
        assert_eq!(keyboard.keysym(3), 0);
        assert_eq!(keyboard.keysym(200), 0);
        assert_eq!(keyboard.keycodes(0x61), vec![8, 10]);
        assert!(keyboard.keycodes(0x41).is_empty());
    }
}

//! [`DisplayServer`] over an X11 connection.
//!
//! Each covering window is an override-redirect window with an invisible
//! cursor. Its background is a server-side pixmap that receives the painted
//! overlay, so a clear of the window shows the latest frame.

use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::Event;
use x11rb::protocol::randr::{self, ConnectionExt as _, NotifyMask};
use x11rb::protocol::xproto::{
    ChangeGCAux, ChangeWindowAttributesAux, Char2b, ConfigureWindowAux, ConnectionExt as _, CreateGCAux,
    CreateWindowAux, Cursor, EventMask, Font, Gcontext, GrabMode, GrabStatus as XGrabStatus, ImageFormat,
    Pixmap, Rectangle, StackMode, Window, WindowClass,
};
use x11rb::xcb_ffi::XCBConnection;
use x11rb::{CURRENT_TIME, NONE};

use veil_core::{Frame, OutputRegion, PixelFormat};
use veil_ui::{LabelRun, Rgba};

use crate::display::{DisplayError, DisplayServer, GrabDenial, GrabStatus, LockEvent, OutputInfo};
use crate::keyboard::KeyTranslator;

const PUT_IMAGE_HEADER_BYTES: usize = 24;
const MAX_TEXT_ITEM_BYTES: usize = 254;

impl From<ConnectError> for DisplayError {
    fn from(error: ConnectError) -> Self {
        Self::Connect(error.to_string())
    }
}

impl From<ConnectionError> for DisplayError {
    fn from(error: ConnectionError) -> Self {
        Self::Connection(error.to_string())
    }
}

impl From<ReplyError> for DisplayError {
    fn from(error: ReplyError) -> Self {
        match error {
            ReplyError::ConnectionError(inner) => inner.into(),
            ReplyError::X11Error(inner) => Self::Request(format!("{:?}", inner.error_kind)),
        }
    }
}

impl From<ReplyOrIdError> for DisplayError {
    fn from(error: ReplyOrIdError) -> Self {
        match error {
            ReplyOrIdError::ConnectionError(inner) => inner.into(),
            ReplyOrIdError::X11Error(inner) => Self::Request(format!("{:?}", inner.error_kind)),
            ReplyOrIdError::IdsExhausted => Self::Request("resource ids exhausted".to_string()),
        }
    }
}

struct CoveringWindow {
    window: Window,
    screen: usize,
    pixmap: Pixmap,
    gc: Gcontext,
    cursor: Cursor,
    width: u16,
    height: u16,
}

/// Production display backend.
pub struct X11DisplayServer {
    conn: XCBConnection,
    default_screen: usize,
    keyboard: KeyTranslator,
    font: Font,
    randr: bool,
    windows: Vec<CoveringWindow>,
}

impl X11DisplayServer {
    /// Connects to `$DISPLAY` and loads the keyboard layout and label font.
    ///
    /// # Errors
    /// Returns [`DisplayError::Connect`] when no server is reachable and
    /// [`DisplayError::Request`] when the font cannot be opened.
    pub fn connect(font_name: &str) -> Result<Self, DisplayError> {
        let (conn, default_screen) = XCBConnection::connect(None)?;
        let keyboard = KeyTranslator::from_device(&conn)?;

        let font = conn.generate_id()?;
        conn.open_font(font, font_name.as_bytes())?.check()?;

        let randr = match conn.extension_information(randr::X11_EXTENSION_NAME)? {
            Some(_) => {
                conn.randr_query_version(1, 1)?.reply()?;
                true
            }
            None => false,
        };
        info!(stage = "display", action = "connected", screens = conn.setup().roots.len(), randr);

        Ok(Self {
            conn,
            default_screen,
            keyboard,
            font,
            randr,
            windows: Vec::new(),
        })
    }

    /// Underlying connection, for the desktop capture.
    pub fn connection(&self) -> &XCBConnection {
        &self.conn
    }

    /// Screen named by `$DISPLAY`.
    pub fn default_screen(&self) -> usize {
        self.default_screen
    }

    fn covering(&self, window: Window) -> Result<&CoveringWindow, DisplayError> {
        self.windows
            .iter()
            .find(|covering| covering.window == window)
            .ok_or_else(|| DisplayError::UnknownWindow(window.to_string()))
    }

    fn screen_root(&self, index: usize) -> Result<&x11rb::protocol::xproto::Screen, DisplayError> {
        self.conn
            .setup()
            .roots
            .get(index)
            .ok_or_else(|| DisplayError::Request(format!("no screen {index}")))
    }

    fn invisible_cursor(&self, root: Window) -> Result<Cursor, DisplayError> {
        let bitmap = self.conn.generate_id()?;
        self.conn.create_pixmap(1, bitmap, root, 8, 8)?;
        let bitmap_gc = self.conn.generate_id()?;
        self.conn
            .create_gc(bitmap_gc, bitmap, &CreateGCAux::new().foreground(0))?;
        self.conn.poly_fill_rectangle(
            bitmap,
            bitmap_gc,
            &[Rectangle {
                x: 0,
                y: 0,
                width: 8,
                height: 8,
            }],
        )?;

        let cursor = self.conn.generate_id()?;
        self.conn
            .create_cursor(cursor, bitmap, bitmap, 0, 0, 0, 0, 0, 0, 0, 0)?;
        self.conn.free_gc(bitmap_gc)?;
        self.conn.free_pixmap(bitmap)?;
        Ok(cursor)
    }

    fn backing_pixmap(&self, window: Window, screen: usize, width: u16, height: u16) -> Result<Pixmap, DisplayError> {
        let depth = self.screen_root(screen)?.root_depth;
        let pixmap = self.conn.generate_id()?;
        self.conn.create_pixmap(depth, pixmap, window, width, height)?;
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().background_pixmap(pixmap),
        )?;
        Ok(pixmap)
    }

    fn upload(&self, covering: &CoveringWindow, surface: &Frame) -> Result<(), DisplayError> {
        if surface.format() != PixelFormat::Bgrx {
            return Err(DisplayError::Surface(format!("{:?} is not a server format", surface.format())));
        }
        let depth = self.screen_root(covering.screen)?.root_depth;
        let width = surface.width().min(u32::from(covering.width)) as u16;
        let height = surface.height().min(u32::from(covering.height)) as u16;
        if width == 0 || height == 0 {
            return Ok(());
        }

        let row_bytes = usize::from(width) * Frame::BYTES_PER_PIXEL;
        let budget = self.conn.maximum_request_bytes().saturating_sub(PUT_IMAGE_HEADER_BYTES);
        let rows_per_request = (budget / row_bytes).max(1);
        let mut chunk = Vec::with_capacity(rows_per_request.min(usize::from(height)) * row_bytes);

        let mut y = 0_u16;
        while y < height {
            let rows = rows_per_request.min(usize::from(height - y)) as u16;
            chunk.clear();
            for row in y..y + rows {
                let start = surface.offset(0, u32::from(row));
                chunk.extend_from_slice(&surface.pixels()[start..start + row_bytes]);
            }
            self.conn.put_image(
                ImageFormat::Z_PIXMAP,
                covering.pixmap,
                covering.gc,
                width,
                rows,
                0,
                y as i16,
                0,
                depth,
                &chunk,
            )?;
            y += rows;
        }
        Ok(())
    }

    fn draw_label(&self, covering: &CoveringWindow, label: &LabelRun) -> Result<(), DisplayError> {
        let text: Vec<u8> = label
            .text
            .chars()
            .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
            .take(MAX_TEXT_ITEM_BYTES)
            .collect();
        if text.is_empty() {
            return Ok(());
        }

        let chars: Vec<Char2b> = text.iter().map(|byte| Char2b { byte1: 0, byte2: *byte }).collect();
        let extents = self.conn.query_text_extents(self.font, &chars)?.reply()?;
        let x = label.center_x - f64::from(extents.overall_width) / 2.0;
        let y = label.center_y + f64::from(extents.font_ascent - extents.font_descent) / 2.0;

        self.conn.change_gc(
            covering.gc,
            &ChangeGCAux::new().foreground(true_color_pixel(label.color)),
        )?;

        let mut item = Vec::with_capacity(text.len() + 2);
        item.push(text.len() as u8);
        item.push(0);
        item.extend_from_slice(&text);
        self.conn
            .poly_text8(covering.pixmap, covering.gc, x.round() as i16, y.round() as i16, &item)?;
        Ok(())
    }
}

impl DisplayServer for X11DisplayServer {
    type Window = Window;

    fn outputs(&self) -> Result<Vec<OutputInfo>, DisplayError> {
        Ok(self
            .conn
            .setup()
            .roots
            .iter()
            .enumerate()
            .map(|(index, screen)| OutputInfo {
                index,
                region: OutputRegion {
                    x: 0,
                    y: 0,
                    width: u32::from(screen.width_in_pixels),
                    height: u32::from(screen.height_in_pixels),
                },
            })
            .collect())
    }

    fn create_covering_window(&mut self, output: &OutputInfo) -> Result<Window, DisplayError> {
        let screen = self.screen_root(output.index)?;
        let (root, depth, visual, black, white) = (
            screen.root,
            screen.root_depth,
            screen.root_visual,
            screen.black_pixel,
            screen.white_pixel,
        );
        let width = clamp_u16(output.region.width);
        let height = clamp_u16(output.region.height);

        let cursor = self.invisible_cursor(root)?;
        let window = self.conn.generate_id()?;
        self.conn.create_window(
            depth,
            window,
            root,
            0,
            0,
            width,
            height,
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            &CreateWindowAux::new()
                .override_redirect(1)
                .background_pixel(black)
                .cursor(cursor),
        )?;

        let pixmap = self.backing_pixmap(window, output.index, width, height)?;
        let gc = self.conn.generate_id()?;
        self.conn.create_gc(
            gc,
            pixmap,
            &CreateGCAux::new()
                .foreground(white)
                .background(black)
                .font(self.font),
        )?;

        debug!(stage = "display", action = "window_created", output = output.index, window);
        self.windows.push(CoveringWindow {
            window,
            screen: output.index,
            pixmap,
            gc,
            cursor,
            width,
            height,
        });
        Ok(window)
    }

    fn grab_pointer(&mut self, output: &OutputInfo, window: Window) -> Result<GrabStatus, DisplayError> {
        let root = self.screen_root(output.index)?.root;
        let cursor = self.covering(window)?.cursor;
        let reply = self
            .conn
            .grab_pointer(
                false,
                root,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                cursor,
                CURRENT_TIME,
            )?
            .reply()?;
        Ok(grab_status(reply.status))
    }

    fn grab_keyboard(&mut self, output: &OutputInfo, _window: Window) -> Result<GrabStatus, DisplayError> {
        let root = self.screen_root(output.index)?.root;
        let reply = self
            .conn
            .grab_keyboard(true, root, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        Ok(grab_status(reply.status))
    }

    fn map_raised(&mut self, window: Window) -> Result<(), DisplayError> {
        self.conn.map_window(window)?;
        self.raise(window)
    }

    fn watch_output_changes(&mut self, window: Window) -> Result<bool, DisplayError> {
        if !self.randr {
            return Ok(false);
        }
        self.conn.randr_select_input(window, NotifyMask::SCREEN_CHANGE)?;
        Ok(true)
    }

    fn watch_substructure(&mut self, output: &OutputInfo) -> Result<(), DisplayError> {
        let root = self.screen_root(output.index)?.root;
        self.conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::SUBSTRUCTURE_NOTIFY),
        )?;
        Ok(())
    }

    fn resize(&mut self, window: Window, width: u32, height: u32) -> Result<(), DisplayError> {
        let (screen, old_pixmap) = {
            let covering = self.covering(window)?;
            (covering.screen, covering.pixmap)
        };
        let width = clamp_u16(width);
        let height = clamp_u16(height);

        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new()
                .width(u32::from(width))
                .height(u32::from(height)),
        )?;
        let pixmap = self.backing_pixmap(window, screen, width, height)?;
        self.conn.free_pixmap(old_pixmap)?;

        if let Some(covering) = self.windows.iter_mut().find(|covering| covering.window == window) {
            covering.pixmap = pixmap;
            covering.width = width;
            covering.height = height;
        }
        Ok(())
    }

    fn present(&mut self, window: Window, surface: &Frame, labels: &[LabelRun]) -> Result<(), DisplayError> {
        let covering = self.covering(window)?;
        self.upload(covering, surface)?;
        for label in labels {
            self.draw_label(covering, label)?;
        }
        self.conn.clear_area(false, window, 0, 0, 0, 0)?;
        Ok(())
    }

    fn raise(&mut self, window: Window) -> Result<(), DisplayError> {
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
        Ok(())
    }

    fn bell(&mut self, percent: i8) -> Result<(), DisplayError> {
        self.conn.bell(percent)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.conn.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), DisplayError> {
        self.conn.get_input_focus()?.reply()?;
        Ok(())
    }

    fn next_event(&mut self) -> Result<LockEvent<Window>, DisplayError> {
        loop {
            match self.conn.wait_for_event()? {
                Event::KeyPress(key) => {
                    let keysym = self.keyboard.keysym(key.detail, u16::from(key.state));
                    return Ok(LockEvent::Key(keysym));
                }
                Event::RandrScreenChangeNotify(change) => {
                    return Ok(LockEvent::OutputChanged {
                        window: change.request_window,
                        width: u32::from(change.width),
                        height: u32::from(change.height),
                    });
                }
                Event::MappingNotify(_) => {
                    self.keyboard = KeyTranslator::from_device(&self.conn)?;
                    debug!(stage = "display", action = "keymap_reloaded");
                }
                Event::Error(error) => {
                    warn!(stage = "display", action = "async_error", kind = ?error.error_kind);
                }
                _ => return Ok(LockEvent::Other),
            }
        }
    }
}

fn grab_status(status: XGrabStatus) -> GrabStatus {
    match status {
        XGrabStatus::SUCCESS => GrabStatus::Success,
        XGrabStatus::ALREADY_GRABBED => GrabStatus::AlreadyGrabbed,
        XGrabStatus::INVALID_TIME => GrabStatus::Denied(GrabDenial::InvalidTime),
        XGrabStatus::NOT_VIEWABLE => GrabStatus::Denied(GrabDenial::NotViewable),
        _ => GrabStatus::Denied(GrabDenial::Frozen),
    }
}

fn true_color_pixel(color: Rgba) -> u32 {
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u32;
    (channel(color.r) << 16) | (channel(color.g) << 8) | channel(color.b)
}

fn clamp_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX).max(1)
}

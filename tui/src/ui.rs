mod layout;
mod widgets;

pub use layout::render;
pub use widgets::{
    render_clear_confirmation,
    render_header,
    render_help_screen,
    render_import_overlay,
    render_map,
    render_marker_list,
    render_popup,
    render_status_bar,
};

use crate::FloatOrInt;

#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct Layout {
    /// Gap between neighbouring workspaces on the switch strip, in logical pixels.
    #[knuffel(child, unwrap(argument), default = Self::default().workspace_margin)]
    pub workspace_margin: FloatOrInt<0, 65535>,
    /// Share of a grid cell a window thumbnail may fill.
    #[knuffel(child, unwrap(argument), default = Self::default().window_slot_fraction)]
    pub window_slot_fraction: FloatOrInt<0, 1>,
    #[knuffel(child, unwrap(argument), default = Self::default().workspace_slot_fraction)]
    pub workspace_slot_fraction: FloatOrInt<0, 1>,
    /// Extra scale of a hovered window thumbnail.
    #[knuffel(child, unwrap(argument), default = Self::default().window_hover_growth)]
    pub window_hover_growth: FloatOrInt<0, 10>,
    #[knuffel(child, unwrap(argument), default = Self::default().workspace_hover_growth)]
    pub workspace_hover_growth: FloatOrInt<0, 10>,
    /// Switch progress fraction past which the workspace being switched to gets loaded.
    #[knuffel(child, unwrap(argument), default = Self::default().load_threshold)]
    pub load_threshold: FloatOrInt<0, 1>,
    /// Overdraft past the last workspace that appends a new one.
    #[knuffel(child, unwrap(argument), default = Self::default().creation_threshold)]
    pub creation_threshold: FloatOrInt<0, 10000000>,
    /// Workspace reveal above which every workspace is loaded.
    #[knuffel(child, unwrap(argument), default = Self::default().load_all_threshold)]
    pub load_all_threshold: FloatOrInt<0, 1000000>,
    /// Workspace reveal band in which neighbours in another grid row move out of the way.
    #[knuffel(child, unwrap(argument), default = Self::default().flee_start)]
    pub flee_start: FloatOrInt<0, 1000000>,
    #[knuffel(child, unwrap(argument), default = Self::default().flee_return)]
    pub flee_return: FloatOrInt<0, 1000000>,
    #[knuffel(child, unwrap(argument), default = Self::default().flee_end)]
    pub flee_end: FloatOrInt<0, 1000000>,
    /// Scale the neighbours of the active window shrink to while the carousel turns.
    #[knuffel(child, unwrap(argument), default = Self::default().window_switch_scale)]
    pub window_switch_scale: FloatOrInt<0, 10>,
    /// Horizontal shift of a carousel window at a quarter turn, in logical pixels.
    #[knuffel(child, unwrap(argument), default = Self::default().window_switch_shift)]
    pub window_switch_shift: FloatOrInt<-65535, 65535>,
    /// Scale of a minimized window that has no taskbar button.
    #[knuffel(child, unwrap(argument), default = Self::default().minimized_scale)]
    pub minimized_scale: FloatOrInt<0, 1>,
    /// Opacity of the shade over a workspace whose windows are fully revealed.
    #[knuffel(child, unwrap(argument), default = Self::default().shade_alpha)]
    pub shade_alpha: FloatOrInt<0, 1>,
    /// How much the backdrop darkens with the workspace overview fully revealed.
    #[knuffel(child, unwrap(argument), default = Self::default().backdrop_dim)]
    pub backdrop_dim: FloatOrInt<0, 1>,
    /// Softness of the rubber band past the first and last workspace.
    #[knuffel(child, unwrap(argument), default = Self::default().rubber_band)]
    pub rubber_band: FloatOrInt<1, 1000000>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            workspace_margin: FloatOrInt(100.),
            window_slot_fraction: FloatOrInt(0.825),
            workspace_slot_fraction: FloatOrInt(0.95),
            window_hover_growth: FloatOrInt(0.1),
            workspace_hover_growth: FloatOrInt(0.05),
            load_threshold: FloatOrInt(0.9),
            creation_threshold: FloatOrInt(300000.),
            load_all_threshold: FloatOrInt(100000.),
            flee_start: FloatOrInt(100000.),
            flee_return: FloatOrInt(150000.),
            flee_end: FloatOrInt(200000.),
            window_switch_scale: FloatOrInt(0.5),
            window_switch_shift: FloatOrInt(-300.),
            minimized_scale: FloatOrInt(0.1),
            shade_alpha: FloatOrInt(128. / 255.),
            backdrop_dim: FloatOrInt(0.5),
            rubber_band: FloatOrInt(1_000_000. / 70.),
        }
    }
}

//! Built-in interface set: core objects, seat, xdg-shell and wlr-layer-shell
//!
//! Request and event tables are listed in opcode order. `wl_keyboard` and
//! `wl_touch` are never created, so their factory requests carry no child
//! interface.

use super::interface::{InterfaceDescriptor, MessageDesc, ANONYMOUS_INTERFACE};
use super::wire::{AllowNull, ArgumentType};

/// Closed set of interfaces the runtime can dispatch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    WlDisplay,
    WlRegistry,
    WlCallback,
    WlCompositor,
    WlSurface,
    WlBuffer,
    WlOutput,
    WlSeat,
    WlPointer,
    XdgWmBase,
    XdgPositioner,
    XdgSurface,
    XdgToplevel,
    XdgPopup,
    LayerShell,
    LayerSurface,
}

impl Interface {
    pub const ALL: &'static [Interface] = &[
        Interface::WlDisplay,
        Interface::WlRegistry,
        Interface::WlCallback,
        Interface::WlCompositor,
        Interface::WlSurface,
        Interface::WlBuffer,
        Interface::WlOutput,
        Interface::WlSeat,
        Interface::WlPointer,
        Interface::XdgWmBase,
        Interface::XdgPositioner,
        Interface::XdgSurface,
        Interface::XdgToplevel,
        Interface::XdgPopup,
        Interface::LayerShell,
        Interface::LayerSurface,
    ];

    pub fn descriptor(self) -> &'static InterfaceDescriptor {
        match self {
            Interface::WlDisplay => &WL_DISPLAY_INTERFACE,
            Interface::WlRegistry => &WL_REGISTRY_INTERFACE,
            Interface::WlCallback => &WL_CALLBACK_INTERFACE,
            Interface::WlCompositor => &WL_COMPOSITOR_INTERFACE,
            Interface::WlSurface => &WL_SURFACE_INTERFACE,
            Interface::WlBuffer => &WL_BUFFER_INTERFACE,
            Interface::WlOutput => &WL_OUTPUT_INTERFACE,
            Interface::WlSeat => &WL_SEAT_INTERFACE,
            Interface::WlPointer => &WL_POINTER_INTERFACE,
            Interface::XdgWmBase => &XDG_WM_BASE_INTERFACE,
            Interface::XdgPositioner => &XDG_POSITIONER_INTERFACE,
            Interface::XdgSurface => &XDG_SURFACE_INTERFACE,
            Interface::XdgToplevel => &XDG_TOPLEVEL_INTERFACE,
            Interface::XdgPopup => &XDG_POPUP_INTERFACE,
            Interface::LayerShell => &ZWLR_LAYER_SHELL_V1_INTERFACE,
            Interface::LayerSurface => &ZWLR_LAYER_SURFACE_V1_INTERFACE,
        }
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn request(self, opcode: u16) -> Option<&'static MessageDesc> {
        self.descriptor().requests.get(usize::from(opcode))
    }

    pub fn event(self, opcode: u16) -> Option<&'static MessageDesc> {
        self.descriptor().events.get(usize::from(opcode))
    }

    /// Looks up a request signature, returning its name for logging
    pub fn request_name(self, opcode: u16) -> String {
        match self.request(opcode) {
            Some(desc) => format!("{}.{}", self.name(), desc.name),
            None => format!("{}#{}", self.name(), opcode),
        }
    }
}

/// Interface `wl_display`
pub static WL_DISPLAY_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "wl_display",
    version: 2,
    requests: &[
        MessageDesc {
            name: "sync",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&WL_CALLBACK_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_registry",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&WL_REGISTRY_INTERFACE),
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "error",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Object(AllowNull::No),
                ArgumentType::Uint,
                ArgumentType::Str(AllowNull::No),
            ],
            child_interface: None,
            arg_interfaces: &[&ANONYMOUS_INTERFACE],
        },
        MessageDesc {
            name: "delete_id",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "implementation_error",
            since: 2,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Str(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    c_ptr: None,
};

/// Interface `wl_registry`
pub static WL_REGISTRY_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "wl_registry",
    version: 1,
    requests: &[
        MessageDesc {
            name: "bind",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Str(AllowNull::No),
                ArgumentType::Uint,
                ArgumentType::NewId,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "global",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Str(AllowNull::No),
                ArgumentType::Uint,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "global_remove",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    c_ptr: None,
};

/// Interface `wl_callback`
pub static WL_CALLBACK_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "wl_callback",
    version: 1,
    requests: &[],
    events: &[
        MessageDesc {
            name: "done",
            since: 1,
            is_destructor: true,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    c_ptr: None,
};

/// Interface `wl_compositor`
pub static WL_COMPOSITOR_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "wl_compositor",
    version: 4,
    requests: &[
        MessageDesc {
            name: "create_surface",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&WL_SURFACE_INTERFACE),
            arg_interfaces: &[],
        },
    ],
    events: &[],
    c_ptr: None,
};

/// Interface `wl_surface`
pub static WL_SURFACE_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "wl_surface",
    version: 4,
    requests: &[
        MessageDesc {
            name: "destroy",
            since: 1,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "attach",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Object(AllowNull::Yes),
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[&WL_BUFFER_INTERFACE],
        },
        MessageDesc {
            name: "damage",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "commit",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[],
    c_ptr: None,
};

/// Interface `wl_buffer`
pub static WL_BUFFER_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "wl_buffer",
    version: 1,
    requests: &[
        MessageDesc {
            name: "destroy",
            since: 1,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "release",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    c_ptr: None,
};

/// Interface `wl_output`
pub static WL_OUTPUT_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "wl_output",
    version: 2,
    requests: &[],
    events: &[
        MessageDesc {
            name: "mode",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "done",
            since: 2,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    c_ptr: None,
};

/// Interface `wl_seat`
pub static WL_SEAT_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "wl_seat",
    version: 5,
    requests: &[
        MessageDesc {
            name: "get_pointer",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&WL_POINTER_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_keyboard",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_touch",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "release",
            since: 5,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "capabilities",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "name",
            since: 2,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    c_ptr: None,
};

/// Interface `wl_pointer`
pub static WL_POINTER_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "wl_pointer",
    version: 5,
    requests: &[
        MessageDesc {
            name: "set_cursor",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Object(AllowNull::Yes),
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
        MessageDesc {
            name: "release",
            since: 3,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "enter",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Object(AllowNull::No),
                ArgumentType::Fixed,
                ArgumentType::Fixed,
            ],
            child_interface: None,
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
        MessageDesc {
            name: "leave",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Object(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
        MessageDesc {
            name: "motion",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Fixed, ArgumentType::Fixed],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "button",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Uint,
                ArgumentType::Uint,
                ArgumentType::Uint,
                ArgumentType::Uint,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "axis",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Uint, ArgumentType::Fixed],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "frame",
            since: 5,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    c_ptr: None,
};

/// Interface `xdg_wm_base`
pub static XDG_WM_BASE_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "xdg_wm_base",
    version: 3,
    requests: &[
        MessageDesc {
            name: "destroy",
            since: 1,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "create_positioner",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&XDG_POSITIONER_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_xdg_surface",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId, ArgumentType::Object(AllowNull::No)],
            child_interface: Some(&XDG_SURFACE_INTERFACE),
            arg_interfaces: &[&WL_SURFACE_INTERFACE],
        },
        MessageDesc {
            name: "pong",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "ping",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    c_ptr: None,
};

/// Interface `xdg_positioner`
pub static XDG_POSITIONER_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "xdg_positioner",
    version: 3,
    requests: &[
        MessageDesc {
            name: "destroy",
            since: 1,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_size",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_anchor_rect",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_anchor",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_gravity",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_constraint_adjustment",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_offset",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[],
    c_ptr: None,
};

/// Interface `xdg_surface`
pub static XDG_SURFACE_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "xdg_surface",
    version: 3,
    requests: &[
        MessageDesc {
            name: "destroy",
            since: 1,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_toplevel",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::NewId],
            child_interface: Some(&XDG_TOPLEVEL_INTERFACE),
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_popup",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::NewId,
                ArgumentType::Object(AllowNull::Yes),
                ArgumentType::Object(AllowNull::No),
            ],
            child_interface: Some(&XDG_POPUP_INTERFACE),
            arg_interfaces: &[&XDG_SURFACE_INTERFACE, &XDG_POSITIONER_INTERFACE],
        },
        MessageDesc {
            name: "set_window_geometry",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "ack_configure",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "configure",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    c_ptr: None,
};

/// Interface `xdg_toplevel`
pub static XDG_TOPLEVEL_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "xdg_toplevel",
    version: 3,
    requests: &[
        MessageDesc {
            name: "destroy",
            since: 1,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_parent",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::Yes)],
            child_interface: None,
            arg_interfaces: &[&XDG_TOPLEVEL_INTERFACE],
        },
        MessageDesc {
            name: "set_title",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_app_id",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Str(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "show_window_menu",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Object(AllowNull::No),
                ArgumentType::Uint,
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[&WL_SEAT_INTERFACE],
        },
        MessageDesc {
            name: "move",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::No), ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[&WL_SEAT_INTERFACE],
        },
        MessageDesc {
            name: "resize",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Object(AllowNull::No),
                ArgumentType::Uint,
                ArgumentType::Uint,
            ],
            child_interface: None,
            arg_interfaces: &[&WL_SEAT_INTERFACE],
        },
        MessageDesc {
            name: "set_max_size",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_min_size",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_maximized",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "unset_maximized",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_fullscreen",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::Yes)],
            child_interface: None,
            arg_interfaces: &[&WL_OUTPUT_INTERFACE],
        },
        MessageDesc {
            name: "unset_fullscreen",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_minimized",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "configure",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int, ArgumentType::Int, ArgumentType::Array],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "close",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    c_ptr: None,
};

/// Interface `xdg_popup`
pub static XDG_POPUP_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "xdg_popup",
    version: 3,
    requests: &[
        MessageDesc {
            name: "destroy",
            since: 1,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "grab",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::No), ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[&WL_SEAT_INTERFACE],
        },
    ],
    events: &[
        MessageDesc {
            name: "configure",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "popup_done",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    c_ptr: None,
};

/// Interface `zwlr_layer_shell_v1`
pub static ZWLR_LAYER_SHELL_V1_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "zwlr_layer_shell_v1",
    version: 1,
    requests: &[
        MessageDesc {
            name: "get_layer_surface",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::NewId,
                ArgumentType::Object(AllowNull::No),
                ArgumentType::Object(AllowNull::Yes),
                ArgumentType::Uint,
                ArgumentType::Str(AllowNull::No),
            ],
            child_interface: Some(&ZWLR_LAYER_SURFACE_V1_INTERFACE),
            arg_interfaces: &[&WL_SURFACE_INTERFACE, &WL_OUTPUT_INTERFACE],
        },
    ],
    events: &[],
    c_ptr: None,
};

/// Interface `zwlr_layer_surface_v1`
pub static ZWLR_LAYER_SURFACE_V1_INTERFACE: InterfaceDescriptor = InterfaceDescriptor {
    name: "zwlr_layer_surface_v1",
    version: 1,
    requests: &[
        MessageDesc {
            name: "set_size",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_anchor",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_exclusive_zone",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Int],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_margin",
            since: 1,
            is_destructor: false,
            signature: &[
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
                ArgumentType::Int,
            ],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "set_keyboard_interactivity",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "get_popup",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Object(AllowNull::No)],
            child_interface: None,
            arg_interfaces: &[&XDG_POPUP_INTERFACE],
        },
        MessageDesc {
            name: "ack_configure",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "destroy",
            since: 1,
            is_destructor: true,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    events: &[
        MessageDesc {
            name: "configure",
            since: 1,
            is_destructor: false,
            signature: &[ArgumentType::Uint, ArgumentType::Uint, ArgumentType::Uint],
            child_interface: None,
            arg_interfaces: &[],
        },
        MessageDesc {
            name: "closed",
            since: 1,
            is_destructor: false,
            signature: &[],
            child_interface: None,
            arg_interfaces: &[],
        },
    ],
    c_ptr: None,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_names_are_unique() {
        let mut names: Vec<_> = Interface::ALL.iter().map(|i| i.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Interface::ALL.len());
    }

    #[test]
    fn test_request_name_formatting() {
        assert_eq!(
            Interface::LayerSurface.request_name(1),
            "zwlr_layer_surface_v1.set_anchor"
        );
        assert_eq!(Interface::XdgPopup.request_name(9), "xdg_popup#9");
    }

    #[test]
    fn test_object_arguments_name_known_interfaces() {
        let known: Vec<_> = Interface::ALL.iter().map(|i| i.name()).collect();
        for interface in Interface::ALL {
            let desc = interface.descriptor();
            for msg in desc.requests.iter().chain(desc.events) {
                let objects = msg
                    .signature
                    .iter()
                    .filter(|t| matches!(t, ArgumentType::Object(_)))
                    .count();
                assert_eq!(objects, msg.arg_interfaces.len(), "{}.{}", desc.name, msg.name);
                for target in msg.arg_interfaces.iter().chain(msg.child_interface.as_ref()) {
                    if target.name == ANONYMOUS_INTERFACE.name {
                        continue;
                    }
                    assert!(known.contains(&target.name), "{}.{} -> {}", desc.name, msg.name, target.name);
                }
            }
        }
    }
}

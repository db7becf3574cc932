use rhai::{Dynamic, Engine};

use crate::geometry::CPos;
use crate::scripting::value::expect_cell;
use crate::scripting::{GlobalDescriptor, HostContext, ScriptResult};

pub const GLOBAL: GlobalDescriptor = GlobalDescriptor { name: "Camera", register, create };

#[derive(Clone)]
pub struct CameraGlobal {
    ctx: HostContext,
}

fn create(ctx: &HostContext) -> Dynamic {
    Dynamic::from(CameraGlobal { ctx: ctx.clone() })
}

fn register(engine: &mut Engine) {
    engine.register_type_with_name::<CameraGlobal>("CameraGlobal");
    engine.register_get("Position", |this: &mut CameraGlobal| this.ctx.viewport().center());
    // Globals are read-only bindings, so moving the camera is a method call.
    engine.register_fn("SetPosition", |this: CameraGlobal, cell: Dynamic| -> ScriptResult<()> {
        let cell: CPos = expect_cell(&cell, "position")?;
        this.ctx.viewport().set_center(cell);
        Ok(())
    });
}

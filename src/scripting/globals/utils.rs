use rand::Rng;
use rhai::{Array, Dynamic, Engine, FnPtr, NativeCallContext, INT};

use crate::geometry::expand_footprint;
use crate::scripting::value::{expect_cells, is_truthy};
use crate::scripting::{GlobalDescriptor, HostContext, ScriptResult};

pub const GLOBAL: GlobalDescriptor = GlobalDescriptor { name: "Utils", register, create };

/// Simulation ticks per second of game time.
pub const TICKS_PER_SECOND: i64 = 25;

#[derive(Clone)]
pub struct UtilsGlobal {
    ctx: HostContext,
}

fn create(ctx: &HostContext) -> Dynamic {
    Dynamic::from(UtilsGlobal { ctx: ctx.clone() })
}

fn register(engine: &mut Engine) {
    engine.register_type_with_name::<UtilsGlobal>("UtilsGlobal");
    engine.register_fn(
        "Do",
        |call: NativeCallContext, _: UtilsGlobal, items: Array, func: FnPtr| -> ScriptResult<()> {
            for item in items {
                let _ = func.call_within_context::<Dynamic>(&call, (item,))?;
            }
            Ok(())
        },
    );
    engine.register_fn(
        "Any",
        |call: NativeCallContext, _: UtilsGlobal, items: Array, func: FnPtr| -> ScriptResult<bool> {
            for item in items {
                if is_truthy(&func.call_within_context::<Dynamic>(&call, (item,))?) {
                    return Ok(true);
                }
            }
            Ok(false)
        },
    );
    engine.register_fn(
        "All",
        |call: NativeCallContext, _: UtilsGlobal, items: Array, func: FnPtr| -> ScriptResult<bool> {
            for item in items {
                if !is_truthy(&func.call_within_context::<Dynamic>(&call, (item,))?) {
                    return Ok(false);
                }
            }
            Ok(true)
        },
    );
    engine.register_fn("Take", |_: UtilsGlobal, n: INT, items: Array| -> Array {
        items.into_iter().take(n.max(0) as usize).collect()
    });
    engine.register_fn("Skip", |_: UtilsGlobal, items: Array, n: INT| -> Array {
        items.into_iter().skip(n.max(0) as usize).collect()
    });
    engine.register_fn("Random", |this: UtilsGlobal, items: Array| -> ScriptResult<Dynamic> {
        if items.is_empty() {
            return Err("Utils.Random requires a non-empty collection".into());
        }
        let index = this.ctx.world()?.borrow_mut().rng().gen_range(0..items.len());
        Ok(items[index].clone())
    });
    engine.register_fn("RandomInteger", |this: UtilsGlobal, low: INT, high: INT| -> ScriptResult<INT> {
        if high <= low {
            return Ok(low);
        }
        Ok(this.ctx.world()?.borrow_mut().rng().gen_range(low..high))
    });
    engine.register_fn("FormatTime", |_: UtilsGlobal, ticks: INT| format_time(ticks, true));
    engine.register_fn("FormatTime", |_: UtilsGlobal, ticks: INT, leading_zero: bool| {
        format_time(ticks, leading_zero)
    });
    engine.register_fn(
        "ExpandFootprint",
        |_: UtilsGlobal, cells: Dynamic, diagonal: bool| -> ScriptResult<Array> {
            let cells = expect_cells(&cells, "footprint")?;
            Ok(expand_footprint(&cells, diagonal).into_iter().map(Dynamic::from).collect())
        },
    );
}

/// Game time as `MM:SS`, or `H:MM:SS` past the hour. Partial seconds round up.
pub fn format_time(ticks: INT, leading_zero: bool) -> String {
    let ticks = ticks.max(0);
    let seconds = ticks / TICKS_PER_SECOND + INT::from(ticks % TICKS_PER_SECOND != 0);
    let minutes = seconds / 60;
    if minutes >= 60 {
        format!("{}:{:02}:{:02}", minutes / 60, minutes % 60, seconds % 60)
    } else if leading_zero {
        format!("{:02}:{:02}", minutes, seconds % 60)
    } else {
        format!("{}:{:02}", minutes, seconds % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_time_rounds_partial_seconds_up() {
        assert_eq!(format_time(0, true), "00:00");
        assert_eq!(format_time(1, true), "00:01");
        assert_eq!(format_time(25 * 75, true), "01:15");
        assert_eq!(format_time(25 * 75, false), "1:15");
        assert_eq!(format_time(25 * 3_725, true), "1:02:05");
    }

    #[test]
    fn format_time_handles_the_largest_tick_count() {
        assert_eq!(format_time(INT::MAX, true), "102481911520608:37:13");
        assert_eq!(format_time(INT::MIN, false), "0:00");
    }
}

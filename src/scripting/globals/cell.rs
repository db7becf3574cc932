use rhai::{Dynamic, Engine, ImmutableString, INT};

use crate::geometry::{CPos, CVec};
use crate::scripting::error::ArgError;
use crate::scripting::{GlobalDescriptor, HostContext, ScriptResult};

pub const CPOS_GLOBAL: GlobalDescriptor = GlobalDescriptor { name: "CPos", register: register_cpos, create: create_cpos };
pub const CVEC_GLOBAL: GlobalDescriptor = GlobalDescriptor { name: "CVec", register: register_cvec, create: create_cvec };

/// `CPos.New(x, y)`.
#[derive(Clone)]
pub struct CPosGlobal;

/// `CVec.New(x, y)`.
#[derive(Clone)]
pub struct CVecGlobal;

fn create_cpos(_: &HostContext) -> Dynamic {
    Dynamic::from(CPosGlobal)
}

fn create_cvec(_: &HostContext) -> Dynamic {
    Dynamic::from(CVecGlobal)
}

fn unknown_member(type_name: &str, member: &str) -> Box<rhai::EvalAltResult> {
    format!("{type_name} does not define a member '{member}'").into()
}

fn read_only(type_name: &str) -> Box<rhai::EvalAltResult> {
    format!("{type_name} is read-only. Use {type_name}.New to create a new value").into()
}

fn coordinate(name: &'static str, value: INT) -> Result<i32, ArgError> {
    i32::try_from(value).map_err(|_| ArgError::OutOfRange { name, value })
}

fn overflow(expr: String) -> Box<rhai::EvalAltResult> {
    format!("{expr} is outside the map's coordinate range").into()
}

fn register_cpos(engine: &mut Engine) {
    engine.register_type_with_name::<CPosGlobal>("CPosGlobal");
    engine.register_type_with_name::<CPos>("CPos");
    engine.register_fn("New", |_: CPosGlobal, x: INT, y: INT| -> ScriptResult<CPos> {
        Ok(CPos::new(coordinate("x", x)?, coordinate("y", y)?))
    });

    engine.register_get("X", |cell: &mut CPos| cell.x as INT);
    engine.register_get("Y", |cell: &mut CPos| cell.y as INT);
    // Any other member read or any write lands on the indexers.
    engine.register_indexer_get(|cell: &mut CPos, member: ImmutableString| -> ScriptResult<INT> {
        match member.as_str() {
            "X" => Ok(cell.x as INT),
            "Y" => Ok(cell.y as INT),
            other => Err(unknown_member("CPos", other)),
        }
    });
    engine.register_indexer_set(|_: &mut CPos, _: ImmutableString, _: Dynamic| -> ScriptResult<()> {
        Err(read_only("CPos"))
    });

    engine.register_fn("+", |cell: CPos, offset: CVec| -> ScriptResult<CPos> {
        cell.checked_add(offset).ok_or_else(|| overflow(format!("CPos({cell}) + CVec({offset})")))
    });
    engine.register_fn("-", |cell: CPos, offset: CVec| -> ScriptResult<CPos> {
        cell.checked_sub(offset).ok_or_else(|| overflow(format!("CPos({cell}) - CVec({offset})")))
    });
    engine.register_fn("-", |a: CPos, b: CPos| -> ScriptResult<CVec> {
        a.checked_offset_from(b).ok_or_else(|| overflow(format!("CPos({a}) - CPos({b})")))
    });
    engine.register_fn("==", |a: CPos, b: CPos| a == b);
    engine.register_fn("!=", |a: CPos, b: CPos| a != b);
    engine.register_fn("to_string", |cell: &mut CPos| cell.to_string());
    engine.register_fn("to_debug", |cell: &mut CPos| format!("CPos({cell})"));
}

fn register_cvec(engine: &mut Engine) {
    engine.register_type_with_name::<CVecGlobal>("CVecGlobal");
    engine.register_type_with_name::<CVec>("CVec");
    engine.register_fn("New", |_: CVecGlobal, x: INT, y: INT| -> ScriptResult<CVec> {
        Ok(CVec::new(coordinate("x", x)?, coordinate("y", y)?))
    });

    engine.register_get("X", |offset: &mut CVec| offset.x as INT);
    engine.register_get("Y", |offset: &mut CVec| offset.y as INT);
    engine.register_indexer_get(|offset: &mut CVec, member: ImmutableString| -> ScriptResult<INT> {
        match member.as_str() {
            "X" => Ok(offset.x as INT),
            "Y" => Ok(offset.y as INT),
            other => Err(unknown_member("CVec", other)),
        }
    });
    engine.register_indexer_set(|_: &mut CVec, _: ImmutableString, _: Dynamic| -> ScriptResult<()> {
        Err(read_only("CVec"))
    });

    engine.register_fn("+", |a: CVec, b: CVec| -> ScriptResult<CVec> {
        a.checked_add(b).ok_or_else(|| overflow(format!("CVec({a}) + CVec({b})")))
    });
    engine.register_fn("-", |a: CVec, b: CVec| -> ScriptResult<CVec> {
        a.checked_sub(b).ok_or_else(|| overflow(format!("CVec({a}) - CVec({b})")))
    });
    engine.register_fn("==", |a: CVec, b: CVec| a == b);
    engine.register_fn("!=", |a: CVec, b: CVec| a != b);
    engine.register_fn("to_string", |offset: &mut CVec| offset.to_string());
    engine.register_fn("to_debug", |offset: &mut CVec| format!("CVec({offset})"));
}

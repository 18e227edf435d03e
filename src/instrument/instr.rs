//! # 仪器描述文件生成
//!
//! 把装配好的仪器模型序列化为引擎的仪器描述文本
//! (DEFINE/DECLARE/INITIALIZE/TRACE/COMPONENT ... END)。
//! 相对放置的最终坐标解析留给引擎；这里只保证引用在
//! 装配期已经校验过。
//!
//! ## 依赖关系
//! - 被 `sim/runner.rs` 调用
//! - 使用 `instrument/assembly.rs`, `instrument/component.rs`

use crate::instrument::assembly::Instrument;
use crate::instrument::component::{Component, Placement};

/// 生成仪器描述文件内容
pub fn to_instr_string(instrument: &Instrument) -> String {
    let mut out = String::new();

    // DEFINE 行与输入参数
    let params = instrument
        .parameters
        .iter()
        .map(|p| format!("{} = {}", p.name, p.default))
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!("DEFINE INSTRUMENT {}({})\n", instrument.name, params));

    if !instrument.declares.is_empty() {
        out.push_str("\nDECLARE\n%{\n");
        for statement in &instrument.declares {
            out.push_str(&format!("{}\n", statement));
        }
        out.push_str("%}\n");
    }

    if !instrument.initialize.is_empty() {
        out.push_str("\nINITIALIZE\n%{\n");
        for statement in &instrument.initialize {
            out.push_str(&format!("{}\n", statement));
        }
        out.push_str("%}\n");
    }

    out.push_str("\nTRACE\n");

    for component in &instrument.components {
        out.push('\n');
        out.push_str(&render_component(component));
    }

    out.push_str("\nEND\n");

    out
}

/// 单个 COMPONENT 块
fn render_component(component: &Component) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "COMPONENT {} = {}(",
        component.name,
        component.resolved_engine_type()
    ));

    if !component.params.is_empty() {
        let rendered = component
            .params
            .iter()
            .map(|(name, value)| format!("\n    {} = {}", name, value.render()))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&rendered);
    }
    out.push_str(")\n");

    match &component.placement {
        Placement::Absolute(pos) => {
            out.push_str(&format!(
                "AT ({}, {}, {}) ABSOLUTE\n",
                pos[0], pos[1], pos[2]
            ));
        }
        Placement::Relative { to, offset } => {
            out.push_str(&format!(
                "AT ({}, {}, {}) RELATIVE {}\n",
                offset[0], offset[1], offset[2], to
            ));
        }
    }

    if let Some(rotation) = &component.rotation {
        let [rx, ry, rz] = rotation.angles;
        match &rotation.relative_to {
            Some(reference) => {
                out.push_str(&format!(
                    "ROTATED ({}, {}, {}) RELATIVE {}\n",
                    rx, ry, rz, reference
                ));
            }
            None => {
                out.push_str(&format!("ROTATED ({}, {}, {}) ABSOLUTE\n", rx, ry, rz));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::component::{ComponentKind, ParamValue};
    use std::path::PathBuf;

    fn sample_instrument() -> Instrument {
        let mut instrument = Instrument::new("powder_line");
        instrument.add_parameter("lambda", 1.2);
        instrument.add_declare("double mono_theta;");
        instrument.add_initialize("mono_theta = asin(3.355 / (2.0 * 2.0 * PI / lambda)) * RAD2DEG;");

        instrument
            .add_component(
                Component::new("source", ComponentKind::Source)
                    .at([0.0, 0.0, 0.0])
                    .with_param("dist", ParamValue::Num(1.5))
                    .with_param("lambda0", ParamValue::Expr("lambda".into())),
            )
            .unwrap();
        instrument
            .add_component(
                Component::new("mono", ComponentKind::Monochromator)
                    .at_relative("source", [0.0, 0.0, 1.5])
                    .rotated_relative("source", [0.0, 18.4, 0.0]),
            )
            .unwrap();
        instrument
            .add_component(
                Component::new("sample", ComponentKind::Sample)
                    .at_relative("mono", [0.0, 0.0, 1.0])
                    .with_param("reflections", ParamValue::File(PathBuf::from("quartz.hkl"))),
            )
            .unwrap();

        instrument
    }

    #[test]
    fn test_instr_header_and_blocks() {
        let text = to_instr_string(&sample_instrument());

        assert!(text.starts_with("DEFINE INSTRUMENT powder_line(lambda = 1.2)"));
        assert!(text.contains("DECLARE\n%{\ndouble mono_theta;\n%}"));
        assert!(text.contains("INITIALIZE"));
        assert!(text.contains("TRACE"));
        assert!(text.trim_end().ends_with("END"));
    }

    #[test]
    fn test_instr_component_rendering() {
        let text = to_instr_string(&sample_instrument());

        assert!(text.contains("COMPONENT source = Source_simple("));
        assert!(text.contains("lambda0 = lambda"));
        assert!(text.contains("AT (0, 0, 0) ABSOLUTE"));
        assert!(text.contains("AT (0, 0, 1.5) RELATIVE source"));
        assert!(text.contains("ROTATED (0, 18.4, 0) RELATIVE source"));
        assert!(text.contains("reflections = \"quartz.hkl\""));
    }

    #[test]
    fn test_components_emitted_in_declaration_order() {
        let text = to_instr_string(&sample_instrument());

        let source_pos = text.find("COMPONENT source").unwrap();
        let mono_pos = text.find("COMPONENT mono").unwrap();
        let sample_pos = text.find("COMPONENT sample").unwrap();

        assert!(source_pos < mono_pos);
        assert!(mono_pos < sample_pos);
    }
}

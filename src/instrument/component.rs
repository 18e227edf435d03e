//! # 仪器组件数据模型
//!
//! 单个组件：名称、物理元件类别、放置（绝对或相对已声明
//! 组件）、可选转动与参数映射。参数值可以是数值字面量、
//! 字符串、文件路径或引用仪器级变量的符号表达式。
//!
//! ## 依赖关系
//! - 被 `instrument/assembly.rs`, `instrument/instr.rs` 使用

use std::path::PathBuf;

/// 物理元件类别（固定目录）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// 中子源
    Source,
    /// 中子导管
    Guide,
    /// 参考系/支架
    Arm,
    /// 单色器
    Monochromator,
    /// 样品
    Sample,
    /// 监视器（虚拟探测器）
    Monitor,
}

impl ComponentKind {
    /// 引擎组件库中的缺省类型名
    pub fn engine_type(&self) -> &'static str {
        match self {
            ComponentKind::Source => "Source_simple",
            ComponentKind::Guide => "Guide",
            ComponentKind::Arm => "Arm",
            ComponentKind::Monochromator => "Monochromator_flat",
            ComponentKind::Sample => "PowderN",
            ComponentKind::Monitor => "PSD_monitor",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ComponentKind::Source => "source",
            ComponentKind::Guide => "guide",
            ComponentKind::Arm => "arm",
            ComponentKind::Monochromator => "monochromator",
            ComponentKind::Sample => "sample",
            ComponentKind::Monitor => "monitor",
        };
        write!(f, "{}", name)
    }
}

/// 组件参数值
#[derive(Debug, Clone)]
pub enum ParamValue {
    /// 数值字面量
    Num(f64),
    /// 字符串字面量
    Str(String),
    /// 文件路径（模拟前做存在性检查）
    File(PathBuf),
    /// 符号表达式，引用仪器级参数或 DECLARE 变量
    Expr(String),
}

impl ParamValue {
    /// 仪器描述文件中的字面表示
    pub fn render(&self) -> String {
        match self {
            ParamValue::Num(v) => format_num(*v),
            ParamValue::Str(s) => format!("\"{}\"", s),
            ParamValue::File(p) => format!("\"{}\"", p.display()),
            ParamValue::Expr(e) => e.clone(),
        }
    }
}

/// 浮点字面量：整数值不带小数点会被引擎当作 int，统一保留小数
fn format_num(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// 放置方式
#[derive(Debug, Clone)]
pub enum Placement {
    /// 绝对坐标 (m)
    Absolute([f64; 3]),
    /// 相对已声明组件的偏移 (m)
    Relative { to: String, offset: [f64; 3] },
}

impl Placement {
    /// 被引用的组件名（绝对放置无引用）
    pub fn reference(&self) -> Option<&str> {
        match self {
            Placement::Absolute(_) => None,
            Placement::Relative { to, .. } => Some(to),
        }
    }
}

/// 转动方式（欧拉角，度）
#[derive(Debug, Clone)]
pub struct Rotation {
    pub angles: [f64; 3],
    /// None 表示绝对转动
    pub relative_to: Option<String>,
}

/// 仪器组件
#[derive(Debug, Clone)]
pub struct Component {
    /// 组件名（仪器内唯一）
    pub name: String,
    /// 元件类别
    pub kind: ComponentKind,
    /// 覆盖类别的缺省引擎类型（如特定监视器型号）
    pub engine_type: Option<String>,
    /// 参数映射（保持插入顺序）
    pub params: Vec<(String, ParamValue)>,
    /// 放置
    pub placement: Placement,
    /// 可选转动
    pub rotation: Option<Rotation>,
}

impl Component {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Component {
            name: name.into(),
            kind,
            engine_type: None,
            params: Vec::new(),
            placement: Placement::Absolute([0.0, 0.0, 0.0]),
            rotation: None,
        }
    }

    /// 覆盖引擎组件类型
    pub fn with_engine_type(mut self, engine_type: impl Into<String>) -> Self {
        self.engine_type = Some(engine_type.into());
        self
    }

    /// 绝对放置
    pub fn at(mut self, position: [f64; 3]) -> Self {
        self.placement = Placement::Absolute(position);
        self
    }

    /// 相对放置
    pub fn at_relative(mut self, to: impl Into<String>, offset: [f64; 3]) -> Self {
        self.placement = Placement::Relative {
            to: to.into(),
            offset,
        };
        self
    }

    /// 相对转动
    pub fn rotated_relative(mut self, to: impl Into<String>, angles: [f64; 3]) -> Self {
        self.rotation = Some(Rotation {
            angles,
            relative_to: Some(to.into()),
        });
        self
    }

    /// 添加参数
    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.params.push((name.into(), value));
        self
    }

    /// 实际使用的引擎类型
    pub fn resolved_engine_type(&self) -> &str {
        self.engine_type
            .as_deref()
            .unwrap_or_else(|| self.kind.engine_type())
    }

    /// 组件引用的其他组件名（放置 + 转动）
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        if let Some(r) = self.placement.reference() {
            refs.push(r);
        }
        if let Some(rot) = &self.rotation {
            if let Some(r) = rot.relative_to.as_deref() {
                refs.push(r);
            }
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_render() {
        assert_eq!(ParamValue::Num(2.0).render(), "2.0");
        assert_eq!(ParamValue::Num(0.025).render(), "0.025");
        assert_eq!(ParamValue::Str("quartz".into()).render(), "\"quartz\"");
        assert_eq!(
            ParamValue::File(PathBuf::from("sample.hkl")).render(),
            "\"sample.hkl\""
        );
        assert_eq!(ParamValue::Expr("mono_theta".into()).render(), "mono_theta");
    }

    #[test]
    fn test_component_references() {
        let component = Component::new("mono", ComponentKind::Monochromator)
            .at_relative("guide_end", [0.0, 0.0, 0.5])
            .rotated_relative("guide_end", [0.0, 18.4, 0.0]);

        assert_eq!(component.references(), vec!["guide_end", "guide_end"]);
    }

    #[test]
    fn test_engine_type_override() {
        let monitor = Component::new("lmon", ComponentKind::Monitor).with_engine_type("L_monitor");
        assert_eq!(monitor.resolved_engine_type(), "L_monitor");

        let plain = Component::new("psd", ComponentKind::Monitor);
        assert_eq!(plain.resolved_engine_type(), "PSD_monitor");
    }
}

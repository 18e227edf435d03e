//! # CIF 格式解析器
//!
//! 解析晶体学信息文件 (Crystallographic Information File)，
//! 即结构数据库下载接口返回的文本格式。
//!
//! ## 支持的子集
//! ```text
//! data_<name>
//! _cell_length_a    4.9137(2)      # 数值可带不确定度括号
//! _cell_length_b    ...
//! _cell_angle_alpha ...
//! _symmetry_space_group_name_H-M 'P 32 2 1'
//! loop_
//! _atom_site_label
//! _atom_site_type_symbol
//! _atom_site_fract_x
//! _atom_site_fract_y
//! _atom_site_fract_z
//! _atom_site_occupancy
//! Si1 Si 0.4697 0.0 0.0 1.0
//! ...
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{BeamflowError, Result};
use crate::models::{Atom, Crystal, Lattice};
use std::fs;
use std::path::Path;

/// 解析 CIF 文件
pub fn parse_cif_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| BeamflowError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_cif_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 CIF 格式
pub fn parse_cif_content(content: &str, default_name: &str) -> Result<Crystal> {
    let lines: Vec<&str> = content.lines().collect();

    let mut name = default_name.to_string();
    let mut cell: [Option<f64>; 6] = [None; 6];
    let mut space_group: Option<String> = None;
    let mut atoms: Vec<Atom> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();

        if line.is_empty() || line.starts_with('#') {
            i += 1;
            continue;
        }

        if let Some(block) = line.strip_prefix("data_") {
            if !block.is_empty() {
                name = block.to_string();
            }
            i += 1;
            continue;
        }

        if line.starts_with("loop_") {
            // 收集 loop 的列标签
            let mut tags: Vec<String> = Vec::new();
            let mut j = i + 1;
            while j < lines.len() {
                let tag_line = lines[j].trim();
                if tag_line.starts_with('_') {
                    tags.push(
                        tag_line
                            .split_whitespace()
                            .next()
                            .unwrap_or(tag_line)
                            .to_lowercase(),
                    );
                    j += 1;
                } else {
                    break;
                }
            }

            // 只关心 atom_site loop，其余 loop 跳过数据行
            let is_atom_site = tags.iter().any(|t| t.starts_with("_atom_site_fract"));

            while j < lines.len() {
                let data_line = lines[j].trim();
                if data_line.is_empty()
                    || data_line.starts_with('_')
                    || data_line.starts_with("loop_")
                    || data_line.starts_with("data_")
                    || data_line.starts_with('#')
                {
                    break;
                }

                if is_atom_site {
                    if let Some(atom) = parse_atom_site_row(&tags, data_line) {
                        atoms.push(atom);
                    }
                }
                j += 1;
            }

            i = j;
            continue;
        }

        if line.starts_with('_') {
            let mut parts = line.splitn(2, char::is_whitespace);
            let tag = parts.next().unwrap_or("").to_lowercase();
            let value = parts.next().unwrap_or("").trim();

            match tag.as_str() {
                "_cell_length_a" => cell[0] = parse_cif_number(value),
                "_cell_length_b" => cell[1] = parse_cif_number(value),
                "_cell_length_c" => cell[2] = parse_cif_number(value),
                "_cell_angle_alpha" => cell[3] = parse_cif_number(value),
                "_cell_angle_beta" => cell[4] = parse_cif_number(value),
                "_cell_angle_gamma" => cell[5] = parse_cif_number(value),
                "_symmetry_space_group_name_h-m" | "_space_group_name_h-m_alt" => {
                    let sg = strip_cif_quotes(value);
                    if !sg.is_empty() {
                        space_group = Some(sg);
                    }
                }
                _ => {}
            }
        }

        i += 1;
    }

    let [a, b, c, alpha, beta, gamma] = cell;
    let (a, b, c) = match (a, b, c) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => {
            return Err(BeamflowError::ParseError {
                format: "cif".to_string(),
                path: default_name.to_string(),
                reason: "Missing _cell_length_a/b/c".to_string(),
            })
        }
    };

    // 角度缺省按正交晶系处理
    let alpha = alpha.unwrap_or(90.0);
    let beta = beta.unwrap_or(90.0);
    let gamma = gamma.unwrap_or(90.0);

    if atoms.is_empty() {
        return Err(BeamflowError::ParseError {
            format: "cif".to_string(),
            path: default_name.to_string(),
            reason: "No _atom_site loop with fractional coordinates".to_string(),
        });
    }

    let lattice = Lattice::from_parameters(a, b, c, alpha, beta, gamma);
    let mut crystal = Crystal::new(name, lattice, atoms);
    crystal.space_group = space_group;
    crystal.source_format = Some("cif".to_string());

    Ok(crystal)
}

/// 解析 atom_site loop 的一行数据
fn parse_atom_site_row(tags: &[String], line: &str) -> Option<Atom> {
    let fields = split_cif_fields(line);
    if fields.len() < tags.len() {
        return None;
    }

    let x = parse_cif_number(column(tags, &fields, "_atom_site_fract_x")?)?;
    let y = parse_cif_number(column(tags, &fields, "_atom_site_fract_y")?)?;
    let z = parse_cif_number(column(tags, &fields, "_atom_site_fract_z")?)?;

    let label = column(tags, &fields, "_atom_site_label").map(|s| s.to_string());
    let element = column(tags, &fields, "_atom_site_type_symbol")
        .map(element_from_symbol)
        .or_else(|| label.as_deref().map(element_from_symbol))?;

    let mut atom = Atom::new(element, [x, y, z]);

    if let Some(l) = label {
        atom = atom.with_label(l);
    }
    if let Some(occ) =
        column(tags, &fields, "_atom_site_occupancy").and_then(parse_cif_number_opt)
    {
        atom = atom.with_occupancy(occ);
    }
    if let Some(b) =
        column(tags, &fields, "_atom_site_b_iso_or_equiv").and_then(parse_cif_number_opt)
    {
        atom = atom.with_b_iso(b);
    } else if let Some(u) =
        column(tags, &fields, "_atom_site_u_iso_or_equiv").and_then(parse_cif_number_opt)
    {
        // B = 8π² U
        atom = atom.with_b_iso(8.0 * std::f64::consts::PI.powi(2) * u);
    }

    Some(atom)
}

/// 按列标签取对应字段
fn column<'a>(tags: &[String], fields: &'a [String], tag: &str) -> Option<&'a str> {
    tags.iter()
        .position(|t| t == tag)
        .map(|idx| fields[idx].as_str())
}

/// 从类型符号或标签提取元素符号（去掉序号与电荷，如 "Si1", "O2-"）
fn element_from_symbol(symbol: &str) -> String {
    let letters: String = symbol.chars().take_while(|c| c.is_ascii_alphabetic()).collect();

    let mut chars = letters.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) if second.is_ascii_lowercase() => {
            format!("{}{}", first.to_ascii_uppercase(), second)
        }
        (Some(first), _) => first.to_ascii_uppercase().to_string(),
        _ => letters,
    }
}

/// 解析可能带不确定度括号的 CIF 数值，如 "4.9137(2)"
fn parse_cif_number(value: &str) -> Option<f64> {
    let cleaned = match value.find('(') {
        Some(pos) => &value[..pos],
        None => value,
    };
    cleaned.trim().parse().ok()
}

/// 同上，但把 CIF 的缺省占位符 "." 和 "?" 视为无值
fn parse_cif_number_opt(value: &str) -> Option<f64> {
    match value.trim() {
        "." | "?" => None,
        other => parse_cif_number(other),
    }
}

/// 去掉 CIF 的单/双引号
fn strip_cif_quotes(value: &str) -> String {
    value
        .trim()
        .trim_matches('\'')
        .trim_matches('"')
        .trim()
        .to_string()
}

/// 拆分 CIF 数据行字段（支持引号内含空格）
fn split_cif_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                } else {
                    current.push(ch);
                }
            }
            None => {
                if ch == '\'' || ch == '"' {
                    quote = Some(ch);
                } else if ch.is_whitespace() {
                    if !current.is_empty() {
                        fields.push(std::mem::take(&mut current));
                    }
                } else {
                    current.push(ch);
                }
            }
        }
    }
    if !current.is_empty() {
        fields.push(current);
    }

    fields
}

/// 将 Crystal 序列化为 CIF 格式字符串
pub fn to_cif_string(crystal: &Crystal) -> String {
    let (a, b, c, alpha, beta, gamma) = crystal.lattice.parameters();

    let mut result = String::new();

    result.push_str(&format!("data_{}\n", sanitize_block_name(&crystal.name)));
    result.push_str(&format!("_chemical_formula_sum '{}'\n", crystal.formula()));
    result.push_str(&format!("_cell_length_a    {:.6}\n", a));
    result.push_str(&format!("_cell_length_b    {:.6}\n", b));
    result.push_str(&format!("_cell_length_c    {:.6}\n", c));
    result.push_str(&format!("_cell_angle_alpha {:.6}\n", alpha));
    result.push_str(&format!("_cell_angle_beta  {:.6}\n", beta));
    result.push_str(&format!("_cell_angle_gamma {:.6}\n", gamma));
    result.push_str(&format!(
        "_symmetry_space_group_name_H-M '{}'\n",
        crystal.space_group.as_deref().unwrap_or("P 1")
    ));

    result.push_str("loop_\n");
    result.push_str("_atom_site_label\n");
    result.push_str("_atom_site_type_symbol\n");
    result.push_str("_atom_site_fract_x\n");
    result.push_str("_atom_site_fract_y\n");
    result.push_str("_atom_site_fract_z\n");
    result.push_str("_atom_site_occupancy\n");
    result.push_str("_atom_site_B_iso_or_equiv\n");

    let mut counters: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
    for atom in &crystal.atoms {
        let label = match &atom.label {
            Some(l) => l.clone(),
            None => {
                let counter = counters.entry(atom.element.as_str()).or_insert(0);
                *counter += 1;
                format!("{}{}", atom.element, counter)
            }
        };

        result.push_str(&format!(
            "{:8} {:4} {:12.8} {:12.8} {:12.8} {:8.4} {:8.4}\n",
            label,
            atom.element,
            atom.position[0],
            atom.position[1],
            atom.position[2],
            atom.occupancy.unwrap_or(1.0),
            atom.b_iso.unwrap_or(0.0),
        ));
    }

    result
}

/// CIF 块名不允许空白字符
fn sanitize_block_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUARTZ_CIF: &str = r#"#------------------------------------------------------------------------------
data_9000775
_chemical_formula_sum 'O2 Si'
_cell_length_a 4.9137(2)
_cell_length_b 4.9137(2)
_cell_length_c 5.4047(3)
_cell_angle_alpha 90
_cell_angle_beta 90
_cell_angle_gamma 120
_symmetry_space_group_name_H-M 'P 32 2 1'
loop_
_atom_site_label
_atom_site_type_symbol
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
_atom_site_occupancy
_atom_site_B_iso_or_equiv
Si1 Si 0.46970 0.00000 0.00000 1.0 0.52
O1 O 0.41350 0.26690 0.11910 1.0 1.06
O2 O 0.26690 0.41350 0.54757 1.0 1.06
"#;

    #[test]
    fn test_parse_quartz_atom_count_and_cell() {
        let crystal = parse_cif_content(QUARTZ_CIF, "fallback").unwrap();

        assert_eq!(crystal.name, "9000775");
        assert_eq!(crystal.atoms.len(), 3);

        let (a, b, c, alpha, _, gamma) = crystal.lattice.parameters();
        assert!((a - 4.9137).abs() < 1e-4);
        assert!((b - 4.9137).abs() < 1e-4);
        assert!((c - 5.4047).abs() < 1e-4);
        assert!((alpha - 90.0).abs() < 1e-6);
        assert!((gamma - 120.0).abs() < 1e-4);

        assert_eq!(crystal.space_group.as_deref(), Some("P 32 2 1"));
    }

    #[test]
    fn test_parse_quartz_site_metadata() {
        let crystal = parse_cif_content(QUARTZ_CIF, "quartz").unwrap();

        let si = &crystal.atoms[0];
        assert_eq!(si.element, "Si");
        assert_eq!(si.label.as_deref(), Some("Si1"));
        assert!((si.position[0] - 0.4697).abs() < 1e-6);
        assert_eq!(si.occupancy, Some(1.0));
        assert!((si.b_iso.unwrap() - 0.52).abs() < 1e-9);

        let o = &crystal.atoms[1];
        assert_eq!(o.element, "O");
        assert!((o.position[2] - 0.1191).abs() < 1e-6);
    }

    #[test]
    fn test_cif_round_trip_positions() {
        let crystal = parse_cif_content(QUARTZ_CIF, "quartz").unwrap();

        let cif_str = to_cif_string(&crystal);
        let reparsed = parse_cif_content(&cif_str, "round_trip").unwrap();

        assert_eq!(reparsed.atoms.len(), crystal.atoms.len());
        for (a, b) in reparsed.atoms.iter().zip(crystal.atoms.iter()) {
            assert_eq!(a.element, b.element);
            for k in 0..3 {
                assert!((a.position[k] - b.position[k]).abs() < 1e-6);
            }
        }

        let (a1, ..) = crystal.lattice.parameters();
        let (a2, ..) = reparsed.lattice.parameters();
        assert!((a1 - a2).abs() < 1e-5);
    }

    #[test]
    fn test_element_from_decorated_symbols() {
        assert_eq!(element_from_symbol("Si1"), "Si");
        assert_eq!(element_from_symbol("O2-"), "O");
        assert_eq!(element_from_symbol("FE3"), "F"); // 大写第二字母按单字母元素处理
        assert_eq!(element_from_symbol("Na"), "Na");
    }

    #[test]
    fn test_missing_cell_is_format_error() {
        let content = "data_x\nloop_\n_atom_site_fract_x\n0.0\n";
        let result = parse_cif_content(content, "x");
        assert!(matches!(
            result,
            Err(crate::error::BeamflowError::ParseError { .. })
        ));
    }

    #[test]
    fn test_missing_atoms_is_format_error() {
        let content = "data_x\n_cell_length_a 5.0\n_cell_length_b 5.0\n_cell_length_c 5.0\n";
        let result = parse_cif_content(content, "x");
        assert!(matches!(
            result,
            Err(crate::error::BeamflowError::ParseError { .. })
        ));
    }

    #[test]
    fn test_quoted_space_group_with_spaces() {
        let fields = split_cif_fields("Si1 Si 0.5 'some label' 1.0");
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[3], "some label");
    }
}

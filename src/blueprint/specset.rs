//! Specset verification: per-material species fractions over a matset.

use crate::node::Node;

use super::helpers::{log, verify_mcarray_field, verify_object_field, verify_string_field};

pub fn verify(specset: &Node, info: &mut Node) -> bool {
    let proto = "specset";
    let mut res = verify_string_field(proto, specset, info, "matset");

    if !verify_object_field(proto, specset, info, "matset_values") {
        res = false;
    } else {
        let mut mats_res = true;
        let mut common_len = 0usize;
        let names: Vec<String> = specset["matset_values"].child_names().to_vec();
        for name in names {
            let mats = &specset["matset_values"];
            if !verify_mcarray_field(proto, mats, info.fetch_mut("matset_values"), &name) {
                mats_res = false;
                continue;
            }
            let len = mats[name.as_str()]
                .children()
                .next()
                .map(|c| c.dtype().num_elements())
                .unwrap_or(0);
            if common_len == 0 {
                common_len = len;
            } else if common_len != len {
                log::error(
                    info,
                    proto,
                    &format!("`{name}` mcarray length differs from its siblings"),
                );
                mats_res = false;
            }
        }
        res &= mats_res;
    }

    log::validation(info, res);
    res
}

pub mod index {
    use super::*;

    pub fn verify(specset_idx: &Node, info: &mut Node) -> bool {
        let proto = "specset::index";
        let mut res = verify_string_field(proto, specset_idx, info, "matset");
        res &= verify_object_field(proto, specset_idx, info, "species");
        res &= verify_string_field(proto, specset_idx, info, "path");
        log::validation(info, res);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_lengths_must_agree() {
        let mut s = Node::new();
        s["matset"].set_string("mats");
        s["matset_values/steel/fe"].set_slice(&[0.9f64, 0.8]);
        s["matset_values/steel/c"].set_slice(&[0.1f64, 0.2]);
        s["matset_values/air/n2"].set_slice(&[0.8f64, 0.8]);
        let mut info = Node::new();
        assert!(verify(&s, &mut info), "{}", info.to_text());
        s["matset_values/air/n2"].set_slice(&[0.8f64]);
        assert!(!verify(&s, &mut info));
    }
}

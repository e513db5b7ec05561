//! Card templates and CSS of the note type.

use std::fmt;

pub const NORMAL_TEMPLATE_NAME: &str = "Normal";
/// Shares the answer side and CSS with the normal template
pub const BACKWARDS_TEMPLATE_NAME: &str = "Backwards";

/// Card fields that can be hidden from the templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardField {
    DefinitionCn,
    Image,
    Pronunciation,
    Context,
}

/// Template placeholders for the optional card fields; a hidden field
/// renders as an empty string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGroup {
    pub definition_cn: String,
    pub image: String,
    pub pronunciation: String,
    pub context: String,
}

impl Default for FieldGroup {
    fn default() -> Self {
        Self {
            definition_cn: "{{definition_cn}}".to_string(),
            image: "{{image}}".to_string(),
            pronunciation: "{{pronunciation}}".to_string(),
            context: "{{context}}".to_string(),
        }
    }
}

impl FieldGroup {
    pub fn toggle_off(&mut self, field: CardField) {
        log::debug!("FieldGroup: {:?} is toggled off", field);
        match field {
            CardField::DefinitionCn => self.definition_cn.clear(),
            CardField::Image => self.image.clear(),
            CardField::Pronunciation => self.pronunciation.clear(),
            CardField::Context => self.context.clear(),
        }
    }
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "definition_cn={}, image={}, pronunciation={}, context={}",
            self.definition_cn, self.image, self.pronunciation, self.context
        )
    }
}

pub fn normal_qfmt(fg: &FieldGroup) -> String {
    format!(
        r#"<table>
    <tr>
        <td>
            <h1 class="term">{{{{term}}}}</h1>
            <span>{pronunciation}</span>
            <div class="pronounce">
                <span class="phonetic">UK[{{{{ipa}}}}]</span>
            </div>
            <div class="definition">Tap To View</div>
            <div class="definition_cn"></div>
        </td>
        <td style="width: 33%;">
        </td>
    </tr>
</table>
<div class="divider"></div>

<p>{context}</p>
"#,
        pronunciation = fg.pronunciation,
        context = fg.context,
    )
}

pub fn normal_afmt(fg: &FieldGroup) -> String {
    format!(
        r#"<table>
    <tr>
        <td>
        <h1 class="term">{{{{term}}}}</h1>
            <span>{pronunciation}</span>
            <div class="pronounce">
                <span class="phonetic">UK[{{{{ipa}}}}]</span>
            </div>
            <div class="definition">{{{{definition}}}}</div>
            <div class="definition_cn">{definition_cn}</div>
        </td>
        <td style="width: 33%;">
            {image}
        </td>
    </tr>
</table>
<div class="divider"></div>
<p>{context}</p>
</table>
"#,
        pronunciation = fg.pronunciation,
        definition_cn = fg.definition_cn,
        image = fg.image,
        context = fg.context,
    )
}

pub fn backwards_qfmt(fg: &FieldGroup) -> String {
    format!(
        r#"<table>
    <tr>
        <td>
        <h1 class="term"></h1>
            <div class="pronounce">
                <span class="phonetic">UK[Tap To View]</span>
            </div>
            <div class="definition">{{{{definition}}}}</div>
            <div class="definition_cn">{definition_cn}</div>
        </td>
        <td style="width: 33%;">
            {image}
        </td>
    </tr>
</table>
<div class="divider"></div>
<p>{context}</p>
"#,
        definition_cn = fg.definition_cn,
        image = fg.image,
        context = fg.context,
    )
}

pub fn backwards_afmt(fg: &FieldGroup) -> String {
    normal_afmt(fg)
}

pub const CARD_TEMPLATE_CSS: &str = r#".card {
  font-family: arial;
  font-size: 16px;
  text-align: left;
  color: #212121;
  background-color: white;
}
.pronounce {
  line-height: 30px;
  font-size: 26px;
  margin-bottom: 0;
}
.phonetic {
  font-size: 16px;
  font-family: "lucida sans unicode", arial, sans-serif;
  color: #01848f;
}
.term {
  margin-bottom: -5px;
}
.exam_type {
  margin: 1em 0 0em 0;
  color: gray;
}
.divider {
  margin: 1em 0 1em 0;
  border-bottom: 2px solid #4caf50;
}
.phrase,
.sentence {
  color: #01848f;
  padding-right: 1em;
}
img {
  max-height: 300px;
}
tr {
  vertical-align: top;
}
"#;

//! SOAP transport.
//!
//! The client only ever sees [`Transport::call`]: a command name plus a
//! parameter mapping in, a decoded [`SoapNode`] tree out. [`HttpTransport`]
//! is the production implementation; tests substitute their own.

use crate::error::{SubregError, SubregResult};
use crate::models::SubregEnvironment;
use crate::parser::SoapNode;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use serde_json::{Map, Value};

/// Boundary to the remote command endpoint.
///
/// Implementations perform exactly one round trip per call; retries,
/// caching and pooling beyond what the HTTP client does natively are
/// out of scope.
pub trait Transport {
    fn call(
        &self,
        command: &str,
        params: &Map<String, Value>,
    ) -> impl Future<Output = SubregResult<SoapNode>> + Send;
}

/// SOAP 1.1 over HTTPS against the subreg `cmd.php` endpoint
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport for the given environment
    pub fn new(environment: SubregEnvironment) -> Self {
        Self {
            client: Client::new(),
            endpoint: environment.endpoint().to_string(),
        }
    }

    /// Create with a custom endpoint URL
    pub fn with_url(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    async fn call(&self, command: &str, params: &Map<String, Value>) -> SubregResult<SoapNode> {
        let envelope = render_request(command, params);

        tracing::debug!("Calling subreg: {} at {}", command, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", command)
            .body(envelope)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SubregError::Network(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body = response.text().await?;
        decode_response(&body)
    }
}

/// Render the SOAP 1.1 request envelope for one command.
///
/// Every command takes its parameters as a single `data` bundle.
fn render_request(command: &str, params: &Map<String, Value>) -> String {
    let mut data = String::new();
    for (name, value) in params {
        write_param(&mut data, name, value);
    }
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            "<SOAP-ENV:Envelope",
            " xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\"",
            " xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\"",
            " SOAP-ENV:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">",
            "<SOAP-ENV:Body><{command}><data>{data}</data></{command}></SOAP-ENV:Body>",
            "</SOAP-ENV:Envelope>"
        ),
        command = command,
        data = data,
    )
}

fn write_param(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Null => {
            out.push('<');
            out.push_str(name);
            out.push_str(" xsi:nil=\"true\"/>");
        }
        Value::Object(entries) => {
            out.push('<');
            out.push_str(name);
            out.push('>');
            for (key, entry) in entries {
                write_param(out, key, entry);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Value::Array(items) => {
            out.push('<');
            out.push_str(name);
            out.push('>');
            for item in items {
                write_param(out, "item", item);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Value::String(text) => {
            out.push('<');
            out.push_str(name);
            out.push('>');
            out.push_str(&escape(text.as_str()));
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        other => {
            out.push('<');
            out.push_str(name);
            out.push('>');
            out.push_str(&other.to_string());
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

/// Minimal element tree for walking the response body
struct XmlElement {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    fn attr(&self, local_name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name == local_name)
            .map(|(_, value)| value.as_str())
    }

    fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Decode a SOAP response body into the node tree the normalizer expects.
///
/// The interesting payload is the first struct under the `*Response`
/// wrapper inside `Body`; everything above it is envelope plumbing.
fn decode_response(body: &str) -> SubregResult<SoapNode> {
    let root = parse_document(body)?;
    let soap_body = root
        .child("Body")
        .ok_or_else(|| SubregError::Parse("SOAP envelope has no Body".to_string()))?;
    let wrapper = soap_body
        .children
        .first()
        .ok_or_else(|| SubregError::Parse("SOAP Body is empty".to_string()))?;
    if wrapper.name == "Fault" {
        let detail = wrapper
            .child("faultstring")
            .map(|f| f.text.clone())
            .unwrap_or_default();
        return Err(SubregError::Network(format!("SOAP fault: {}", detail)));
    }
    let payload = wrapper
        .children
        .first()
        .ok_or_else(|| SubregError::Parse("SOAP response wrapper is empty".to_string()))?;
    Ok(element_to_node(payload))
}

fn parse_document(body: &str) -> SubregResult<XmlElement> {
    let mut reader = Reader::from_str(body);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                stack.push(open_element(&start));
            }
            Event::Empty(start) => {
                let element = open_element(&start);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(text) => {
                let unescaped = text
                    .unescape()
                    .map_err(|e| SubregError::Parse(format!("XML text decode error: {}", e)))?;
                let trimmed = unescaped.trim();
                if !trimmed.is_empty() {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(trimmed);
                    }
                }
            }
            Event::End(_) => {
                let finished = stack
                    .pop()
                    .ok_or_else(|| SubregError::Parse("unbalanced XML".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(finished),
                    None => root = Some(finished),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or_else(|| SubregError::Parse("empty XML document".to_string()))
}

fn open_element(start: &quick_xml::events::BytesStart) -> XmlElement {
    XmlElement {
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        attrs: start
            .attributes()
            .filter_map(|attr| attr.ok())
            .map(|attr| {
                (
                    String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned(),
                    String::from_utf8_lossy(&attr.value).into_owned(),
                )
            })
            .collect(),
        children: Vec::new(),
        text: String::new(),
    }
}

/// Map one decoded element onto the closed node variants.
fn element_to_node(element: &XmlElement) -> SoapNode {
    if element.children.is_empty() {
        return scalar_from_leaf(element);
    }

    if element.attr("arrayType").is_some() {
        return SoapNode::Array(element.children.iter().map(element_to_node).collect());
    }

    // PHP-SOAP Map entries come through as <item><key/><value/></item>.
    if let (Some(key), Some(value)) = (element.child("key"), element.child("value")) {
        if element.children.len() == 2 {
            return SoapNode::Pair {
                key: key.text.clone(),
                value: Box::new(element_to_node(value)),
            };
        }
    }

    if element.children.len() == 1 {
        return SoapNode::Item(Box::new(element_to_node(&element.children[0])));
    }

    SoapNode::Seq(element.children.iter().map(element_to_node).collect())
}

fn scalar_from_leaf(element: &XmlElement) -> SoapNode {
    if element.attr("nil") == Some("true") {
        return SoapNode::Scalar(Value::Null);
    }
    let is_integer = element
        .attr("type")
        .map(|t| {
            let local = t.rsplit(':').next().unwrap_or(t);
            matches!(local, "int" | "integer" | "long" | "short")
        })
        .unwrap_or(false);
    if is_integer {
        if let Ok(number) = element.text.parse::<i64>() {
            return SoapNode::int(number);
        }
    }
    SoapNode::string(element.text.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::normalize;
    use serde_json::json;

    #[test]
    fn test_render_request_wraps_params_in_data() {
        let mut params = Map::new();
        params.insert("domain".to_string(), json!("example.cz"));
        let envelope = render_request("Check_Domain", &params);
        assert!(envelope.contains("<Check_Domain><data><domain>example.cz</domain></data></Check_Domain>"));
        assert!(envelope.starts_with("<?xml"));
    }

    #[test]
    fn test_render_request_escapes_text_and_serializes_nulls() {
        let mut params = Map::new();
        params.insert("content".to_string(), json!("a&b <c>"));
        params.insert("template".to_string(), Value::Null);
        let envelope = render_request("Add_DNS_Zone", &params);
        assert!(envelope.contains("<content>a&amp;b &lt;c&gt;</content>"));
        assert!(envelope.contains("<template xsi:nil=\"true\"/>"));
    }

    #[test]
    fn test_render_request_nested_record() {
        let mut params = Map::new();
        params.insert("domain".to_string(), json!("example.cz"));
        params.insert(
            "record".to_string(),
            json!({"type": "MX", "content": "mail.example.cz", "prio": 10}),
        );
        let envelope = render_request("Add_DNS_Record", &params);
        assert!(envelope.contains("<record><content>mail.example.cz</content><prio>10</prio><type>MX</type></record>"));
    }

    #[test]
    fn test_decode_map_response() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns:xsd="http://www.w3.org/2001/XMLSchema"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <SOAP-ENV:Body>
    <ns1:Check_DomainResponse xmlns:ns1="http://subreg.cz/soap">
      <response xsi:type="ns2:Map">
        <item>
          <key xsi:type="xsd:string">status</key>
          <value xsi:type="xsd:string">ok</value>
        </item>
        <item>
          <key xsi:type="xsd:string">data</key>
          <value xsi:type="ns2:Map">
            <item>
              <key xsi:type="xsd:string">avail</key>
              <value xsi:type="xsd:int">1</value>
            </item>
          </value>
        </item>
      </response>
    </ns1:Check_DomainResponse>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;
        let node = decode_response(body).unwrap();
        assert_eq!(
            normalize(&node),
            json!({"status": "ok", "data": {"avail": 1}})
        );
    }

    #[test]
    fn test_decode_typed_array_response() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns:xsd="http://www.w3.org/2001/XMLSchema"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xmlns:SOAP-ENC="http://schemas.xmlsoap.org/soap/encoding/">
  <SOAP-ENV:Body>
    <ns1:Get_DNS_ZoneResponse xmlns:ns1="http://subreg.cz/soap">
      <response xsi:type="ns2:Map">
        <item>
          <key xsi:type="xsd:string">status</key>
          <value xsi:type="xsd:string">ok</value>
        </item>
        <item>
          <key xsi:type="xsd:string">data</key>
          <value xsi:type="ns2:Map">
            <item>
              <key xsi:type="xsd:string">records</key>
              <value SOAP-ENC:arrayType="ns2:Map[2]" xsi:type="SOAP-ENC:Array">
                <item xsi:type="ns2:Map">
                  <item>
                    <key xsi:type="xsd:string">id</key>
                    <value xsi:type="xsd:int">11</value>
                  </item>
                  <item>
                    <key xsi:type="xsd:string">type</key>
                    <value xsi:type="xsd:string">MX</value>
                  </item>
                  <item>
                    <key xsi:type="xsd:string">content</key>
                    <value xsi:type="xsd:string">mail.example.cz</value>
                  </item>
                </item>
                <item xsi:type="ns2:Map">
                  <item>
                    <key xsi:type="xsd:string">id</key>
                    <value xsi:type="xsd:int">12</value>
                  </item>
                  <item>
                    <key xsi:type="xsd:string">type</key>
                    <value xsi:type="xsd:string">A</value>
                  </item>
                  <item>
                    <key xsi:type="xsd:string">content</key>
                    <value xsi:type="xsd:string">192.0.2.1</value>
                  </item>
                </item>
              </value>
            </item>
          </value>
        </item>
      </response>
    </ns1:Get_DNS_ZoneResponse>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;
        let node = decode_response(body).unwrap();
        assert_eq!(
            normalize(&node),
            json!({
                "status": "ok",
                "data": {
                    "records": [
                        {"id": 11, "type": "MX", "content": "mail.example.cz"},
                        {"id": 12, "type": "A", "content": "192.0.2.1"},
                    ]
                }
            })
        );
    }

    #[test]
    fn test_decode_nil_leaf() {
        let body = r#"<?xml version="1.0"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <SOAP-ENV:Body>
    <ns1:POLL_GetResponse xmlns:ns1="http://subreg.cz/soap">
      <response>
        <item>
          <key>status</key>
          <value xsi:nil="true"/>
        </item>
      </response>
    </ns1:POLL_GetResponse>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;
        let node = decode_response(body).unwrap();
        assert_eq!(normalize(&node), json!({"status": null}));
    }

    #[test]
    fn test_decode_fault_is_an_error() {
        let body = r#"<?xml version="1.0"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <SOAP-ENV:Fault>
      <faultcode>SOAP-ENV:Server</faultcode>
      <faultstring>Internal error</faultstring>
    </SOAP-ENV:Fault>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;
        match decode_response(body) {
            Err(SubregError::Network(message)) => assert!(message.contains("Internal error")),
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[test]
    fn test_transport_endpoints() {
        let production = HttpTransport::new(SubregEnvironment::Production);
        assert_eq!(production.endpoint(), "https://soap.subreg.cz/cmd.php");
        let custom = HttpTransport::with_url("https://localhost/cmd.php".to_string());
        assert_eq!(custom.endpoint(), "https://localhost/cmd.php");
    }
}
